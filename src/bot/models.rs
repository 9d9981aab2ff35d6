use serde::Deserialize;

/// One entry of a `getUpdates` response. Only chat messages are read.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_updates() {
        let json = r#"[
            {"update_id": 10, "message": {"message_id": 1, "chat": {"id": -100123, "type": "group"}, "text": "/list"}},
            {"update_id": 11, "edited_message": {"message_id": 1}},
            {"update_id": 12, "message": {"message_id": 2, "chat": {"id": 5, "type": "private"}, "photo": []}}
        ]"#;
        let updates: Vec<Update> = serde_json::from_str(json).unwrap();
        assert_eq!(updates.len(), 3);
        let message = updates[0].message.as_ref().unwrap();
        assert_eq!(message.chat.id, -100123);
        assert_eq!(message.text.as_deref(), Some("/list"));
        assert!(updates[1].message.is_none());
        assert!(updates[2].message.as_ref().unwrap().text.is_none());
    }
}
