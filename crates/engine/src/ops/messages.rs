//! Direct messages between principals.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, Condition, QueryFilter, QueryOrder, prelude::*};

use crate::{EngineError, ResultEngine, garages, messages, users, vendors};

use super::{Engine, normalize_required};

/// Latest message exchanged with one partner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageThread {
    pub partner_user_id: i32,
    pub partner_name: String,
    pub last_body: String,
    pub last_sent_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationMessage {
    pub id: i32,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub is_sender: bool,
}

fn between(user_id: i32, partner_id: i32) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(messages::Column::SenderUserId.eq(user_id))
                .add(messages::Column::ReceiverUserId.eq(partner_id)),
        )
        .add(
            Condition::all()
                .add(messages::Column::SenderUserId.eq(partner_id))
                .add(messages::Column::ReceiverUserId.eq(user_id)),
        )
}

impl Engine {
    pub async fn send_message(
        &self,
        sender_id: i32,
        receiver_id: i32,
        body: &str,
    ) -> ResultEngine<messages::Model> {
        let body = normalize_required(body, "message")?;
        if sender_id == receiver_id {
            return Err(EngineError::Validation(
                "cannot send a message to yourself".to_string(),
            ));
        }
        if users::Entity::find_by_id(receiver_id)
            .one(&self.database)
            .await?
            .is_none()
        {
            return Err(EngineError::NotFound(format!("user {receiver_id}")));
        }

        let message = messages::ActiveModel {
            sender_user_id: ActiveValue::Set(sender_id),
            receiver_user_id: ActiveValue::Set(receiver_id),
            body: ActiveValue::Set(body),
            sent_at: ActiveValue::Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.database)
        .await?;
        tracing::debug!(sender_id, receiver_id, message_id = message.id, "message sent");
        Ok(message)
    }

    /// One entry per conversation partner, most recent conversation first.
    pub async fn message_threads(&self, user_id: i32) -> ResultEngine<Vec<MessageThread>> {
        let all = messages::Entity::find()
            .filter(
                Condition::any()
                    .add(messages::Column::SenderUserId.eq(user_id))
                    .add(messages::Column::ReceiverUserId.eq(user_id)),
            )
            .order_by_desc(messages::Column::SentAt)
            .order_by_desc(messages::Column::Id)
            .all(&self.database)
            .await?;

        let mut latest: Vec<messages::Model> = Vec::new();
        for message in all {
            let partner = partner_of(&message, user_id);
            if !latest.iter().any(|m| partner_of(m, user_id) == partner) {
                latest.push(message);
            }
        }

        let names = self
            .display_names(latest.iter().map(|m| partner_of(m, user_id)).collect())
            .await?;
        Ok(latest
            .into_iter()
            .map(|message| {
                let partner = partner_of(&message, user_id);
                MessageThread {
                    partner_user_id: partner,
                    partner_name: names
                        .get(&partner)
                        .cloned()
                        .unwrap_or_else(|| format!("user {partner}")),
                    last_body: message.body,
                    last_sent_at: message.sent_at,
                }
            })
            .collect())
    }

    /// Messages between `user_id` and `partner_id`, oldest first.
    pub async fn conversation(
        &self,
        user_id: i32,
        partner_id: i32,
    ) -> ResultEngine<Vec<ConversationMessage>> {
        Ok(messages::Entity::find()
            .filter(between(user_id, partner_id))
            .order_by_asc(messages::Column::SentAt)
            .order_by_asc(messages::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(|message| ConversationMessage {
                id: message.id,
                is_sender: message.sender_user_id == user_id,
                body: message.body,
                sent_at: message.sent_at,
            })
            .collect())
    }

    /// Business name when the user owns one, otherwise the email local part.
    pub async fn display_name(&self, user_id: i32) -> ResultEngine<String> {
        self.display_names(vec![user_id])
            .await?
            .remove(&user_id)
            .ok_or_else(|| EngineError::NotFound(format!("user {user_id}")))
    }

    async fn display_names(&self, user_ids: Vec<i32>) -> ResultEngine<HashMap<i32, String>> {
        let mut names: HashMap<i32, String> = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids.clone()))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|user| (user.id, user.display_name()))
            .collect();
        for garage in garages::Entity::find()
            .filter(garages::Column::UserId.is_in(user_ids.clone()))
            .all(&self.database)
            .await?
        {
            names.insert(garage.user_id, garage.name);
        }
        for vendor in vendors::Entity::find()
            .filter(vendors::Column::UserId.is_in(user_ids))
            .all(&self.database)
            .await?
        {
            names.insert(vendor.user_id, vendor.name);
        }
        Ok(names)
    }
}

fn partner_of(message: &messages::Model, user_id: i32) -> i32 {
    if message.sender_user_id == user_id {
        message.receiver_user_id
    } else {
        message.sender_user_id
    }
}
