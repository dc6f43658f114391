//! Entities mirrored from the bulletin API's JSON shapes.
//!
//! # Design
//! These records are read-mostly copies of server-owned data; the client
//! never mutates them locally and re-fetches instead. They are defined
//! independently of the mock server's types; integration tests catch drift.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub count: usize,
}

/// A page of entities as returned by collection endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection<T> {
    pub metadata: Metadata,
    pub contents: Vec<T>,
}

impl<T> Collection<T> {
    pub fn new(contents: Vec<T>) -> Self {
        Self {
            metadata: Metadata {
                count: contents.len(),
            },
            contents,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Account {
    /// Placeholder returned for accounts that cannot be resolved.
    pub fn unavailable() -> Self {
        Self {
            id: "null".to_string(),
            username: "unavailable".to_string(),
            profile_image: None,
            display_name: Some("[Unavailable]".to_string()),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.id == "null"
    }
}

/// The logged-in account, which additionally exposes its email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedAccount {
    #[serde(flatten)]
    pub account: Account,
    pub email: String,
}

/// Login form fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Email address or username.
    pub identifier: String,
    pub password: String,
}

impl Credentials {
    pub fn new(identifier: &str, password: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            password: password.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub identifier: String,
    pub name: String,
    pub icon: String,
    pub owner_id: String,
    pub public: bool,
}

/// Request payload for creating a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBoard {
    pub name: String,
    pub identifier: String,
    pub icon: String,
    pub public: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub board_id: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub list_id: Option<String>,
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub pin: Option<Pin>,
    #[serde(flatten)]
    pub content: ItemContent,
}

/// Type-specific item fields, tagged by the `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemContent {
    Note {
        text: String,
    },
    Link {
        title: Option<String>,
        url: String,
    },
    Media {
        url: String,
        size: (u32, u32),
    },
    Todo {
        text: String,
        items: Option<Collection<TodoItem>>,
    },
    List {
        title: String,
        items: Option<Collection<Item>>,
    },
    Document {
        title: String,
        text: String,
    },
}

impl ItemContent {
    pub fn kind(&self) -> &'static str {
        match self {
            ItemContent::Note { .. } => "note",
            ItemContent::Link { .. } => "link",
            ItemContent::Media { .. } => "media",
            ItemContent::Todo { .. } => "todo",
            ItemContent::List { .. } => "list",
            ItemContent::Document { .. } => "document",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub list_id: String,
    pub text: String,
    #[serde(default)]
    pub link: Option<String>,
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    pub id: String,
    pub board_id: String,
    pub item_id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub compass: bool,
    #[serde(default)]
    pub connections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub account_id: String,
    pub entity_id: String,
    pub entity_type: String,
    pub report_type: String,
    pub report_text: String,
    pub status: String,
    #[serde(default)]
    pub moderator_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub resolved_at: Option<OffsetDateTime>,
}

/// Request payload for filing a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReport {
    pub entity_id: String,
    pub entity_type: String,
    pub report_type: String,
    pub report_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticated_account_flattens_account_fields() {
        let json = r#"{"id":"a1","username":"ada","profile_image":null,"display_name":"Ada","email":"ada@example.com"}"#;
        let me: AuthenticatedAccount = serde_json::from_str(json).unwrap();
        assert_eq!(me.account.username, "ada");
        assert_eq!(me.account.display_name.as_deref(), Some("Ada"));
        assert_eq!(me.email, "ada@example.com");
    }

    #[test]
    fn account_optional_fields_default_to_none() {
        let account: Account = serde_json::from_str(r#"{"id":"a2","username":"bob"}"#).unwrap();
        assert!(account.profile_image.is_none());
        assert!(account.display_name.is_none());
    }

    #[test]
    fn unavailable_placeholder() {
        let placeholder = Account::unavailable();
        assert!(placeholder.is_unavailable());
        assert_eq!(placeholder.username, "unavailable");
        assert_eq!(placeholder.display_name.as_deref(), Some("[Unavailable]"));
    }

    #[test]
    fn items_decode_by_type_tag() {
        let json = r#"{
            "metadata": {"count": 2},
            "contents": [
                {"id":"i1","board_id":"b1","position":"10,20","list_id":null,"index":null,"pin":null,
                 "type":"note","text":"hello"},
                {"id":"i2","board_id":"b1","position":null,"list_id":null,"index":null,
                 "pin":{"id":"p1","board_id":"b1","item_id":"i2","label":"start","compass":true,"connections":["p2"]},
                 "type":"todo","text":"chores",
                 "items":{"metadata":{"count":1},"contents":[{"id":"t1","list_id":"i2","text":"dishes","link":null,"done":false}]}}
            ]
        }"#;
        let items: Collection<Item> = serde_json::from_str(json).unwrap();
        assert_eq!(items.metadata.count, 2);
        assert_eq!(items.contents[0].content, ItemContent::Note { text: "hello".to_string() });
        assert_eq!(items.contents[0].position.as_deref(), Some("10,20"));

        let todo = &items.contents[1];
        assert_eq!(todo.content.kind(), "todo");
        assert_eq!(todo.pin.as_ref().unwrap().connections, vec!["p2".to_string()]);
        match &todo.content {
            ItemContent::Todo { items: Some(list), .. } => assert_eq!(list.contents[0].text, "dishes"),
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[test]
    fn media_item_size_is_a_pair() {
        let json = r#"{"id":"i3","board_id":"b1","type":"media","url":"/img.png","size":[300,400]}"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(
            item.content,
            ItemContent::Media {
                url: "/img.png".to_string(),
                size: (300, 400)
            }
        );
    }

    #[test]
    fn report_timestamps_are_rfc3339() {
        let json = r#"{"id":"r1","account_id":"a1","entity_id":"b1","entity_type":"board",
            "report_type":"spam","report_text":"ads everywhere","status":"open","moderator_id":null,
            "created_at":"2024-03-01T12:00:00Z","resolved_at":null}"#;
        let report: Report = serde_json::from_str(json).unwrap();
        assert_eq!(report.created_at.unix_timestamp(), 1_709_294_400);
        assert!(report.resolved_at.is_none());
    }
}
