// Source: https://core.telegram.org/bots/api (getUpdates, sendMessage)
#[derive(Debug, serde::Deserialize)]
pub struct TgResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

#[derive(Debug, serde::Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    // we ignore edited messages, callbacks, etc.
}

#[derive(Debug, serde::Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct SendMessage<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    pub parse_mode: &'static str,
    pub disable_web_page_preview: bool,
}
