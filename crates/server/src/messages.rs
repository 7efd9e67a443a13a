//! Inbox and direct messages between any two principals.

use api_types::{
    Flash,
    message::{MessageView, MessagesQuery, MessagesView, SendForm, ThreadView},
};
use axum::{
    Extension, Form, Json,
    extract::{Query, State},
    response::Redirect,
};
use engine::Principal;

use crate::{
    ServerError,
    forms::{non_blank, parse_id},
    redirect_outcome,
    server::ServerState,
};

/// Thread list, plus the conversation with `?with=<user id>` when given
pub async fn inbox(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Query(query): Query<MessagesQuery>,
    Query(flash): Query<Flash>,
) -> Result<Json<MessagesView>, ServerError> {
    let threads = state
        .engine
        .message_threads(principal.user_id)
        .await?
        .into_iter()
        .map(|thread| ThreadView {
            partner_user_id: thread.partner_user_id,
            partner_name: thread.partner_name,
            last_body: thread.last_body,
            last_sent_at: thread.last_sent_at,
        })
        .collect();

    let partner = non_blank(query.with.as_deref())
        .map(|raw| parse_id(raw, "user id"))
        .transpose()?;
    let (partner_name, conversation) = match partner {
        Some(partner_id) => {
            let name = state.engine.display_name(partner_id).await?;
            let conversation = state
                .engine
                .conversation(principal.user_id, partner_id)
                .await?
                .into_iter()
                .map(|message| MessageView {
                    id: message.id,
                    body: message.body,
                    sent_at: message.sent_at,
                    is_sender: message.is_sender,
                })
                .collect();
            (Some(name), conversation)
        }
        None => (None, Vec::new()),
    };

    Ok(Json(MessagesView {
        threads,
        partner_user_id: partner,
        partner_name,
        conversation,
        flash,
    }))
}

pub async fn send(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Form(form): Form<SendForm>,
) -> Redirect {
    let receiver = parse_id(&form.receiver_id, "receiver id");
    let back = match &receiver {
        Ok(id) => format!("/messages?with={id}"),
        Err(_) => "/messages".to_string(),
    };
    let outcome = async {
        state
            .engine
            .send_message(principal.user_id, receiver?, &form.body)
            .await?;
        Ok::<_, ServerError>("Message sent.".to_string())
    }
    .await;
    redirect_outcome(&back, outcome)
}
