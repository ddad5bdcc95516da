// Localized error messages

use serde::{Deserialize, Serialize};

/// Language of client-facing error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ja,
    En,
}

/// Message keys for every classified error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    Parse,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    TooLongParameter,
    Internal,
    Server,
    Authentication,
    Database,
}

/// Message table for one language, fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageCatalog {
    language: Language,
}

impl MessageCatalog {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn message(&self, key: MessageKey) -> &'static str {
        match self.language {
            Language::Ja => ja(key),
            Language::En => en(key),
        }
    }
}

fn ja(key: MessageKey) -> &'static str {
    match key {
        MessageKey::Parse => "パラメータの変換に失敗しました",
        MessageKey::InvalidRequest => "リクエストが不正です",
        MessageKey::MethodNotFound => "メソッドが存在しません",
        MessageKey::InvalidParams => "パラメータが不正です",
        MessageKey::TooLongParameter => "パラメータが長すぎます",
        MessageKey::Internal => "内部エラーが発生しました",
        MessageKey::Server => "サーバエラーが発生しました",
        MessageKey::Authentication => "認証に失敗しました",
        MessageKey::Database => "データベースでの不整合が発生しました",
    }
}

fn en(key: MessageKey) -> &'static str {
    match key {
        MessageKey::Parse => "Parse error",
        MessageKey::InvalidRequest => "Invalid Request",
        MessageKey::MethodNotFound => "Method not found",
        MessageKey::InvalidParams => "Invalid params",
        MessageKey::TooLongParameter => "Parameter too long",
        MessageKey::Internal => "Internal error",
        MessageKey::Server => "Server error",
        MessageKey::Authentication => "Authentication failed",
        MessageKey::Database => "Database inconsistency",
    }
}
