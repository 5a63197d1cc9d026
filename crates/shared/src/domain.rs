use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned identifier. The backends hand out integers today, but the
/// client treats ids as opaque and accepts string ids as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub RecordId);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(ProductId);

/// A user as listed by the user service. The password is write-only and never
/// part of the listed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn display_line(&self) -> String {
        format!("{} - {}", self.name, self.email)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
}

impl Product {
    pub fn display_line(&self) -> String {
        match self.stock {
            Some(stock) => format!("{} - ${:.2} (stock: {stock})", self.name, self.price),
            None => format!("{} - ${:.2}", self.name, self.price),
        }
    }
}

/// Form state behind the "create user" form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Form state behind the "create product" form. `price` holds the raw text
/// the user typed; it is only parsed when the draft is submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: String,
}

impl ProductDraft {
    /// Parses the longest numeric prefix of the price text, ignoring leading
    /// whitespace (`"12.5 EUR"` is 12.5). Text with no numeric prefix is NaN.
    pub fn parsed_price(&self) -> f64 {
        let text = self.price.trim_start();
        text.char_indices()
            .map(|(idx, ch)| idx + ch.len_utf8())
            .rev()
            .find_map(|end| text[..end].parse::<f64>().ok())
            .unwrap_or(f64::NAN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_display_line_is_name_dash_email() {
        let user: User =
            serde_json::from_str(r#"{"id":1,"name":"Ana","email":"a@x.com"}"#).expect("user");
        assert_eq!(user.display_line(), "Ana - a@x.com");
        assert_eq!(user.id, UserId(RecordId::Int(1)));
    }

    #[test]
    fn product_display_line_uses_two_fraction_digits() {
        let product: Product =
            serde_json::from_str(r#"{"id":"p-1","name":"Lamp","price":12.5}"#).expect("product");
        assert_eq!(product.display_line(), "Lamp - $12.50");

        let stocked = Product {
            stock: Some(3),
            ..product
        };
        assert_eq!(stocked.display_line(), "Lamp - $12.50 (stock: 3)");
    }

    #[test]
    fn price_parse_falls_back_to_nan() {
        let mut draft = ProductDraft {
            price: " 12.5 ".into(),
            ..ProductDraft::default()
        };
        assert_eq!(draft.parsed_price(), 12.5);

        draft.price = "7.25 EUR".into();
        assert_eq!(draft.parsed_price(), 7.25);

        draft.price = "abc".into();
        assert!(draft.parsed_price().is_nan());
    }

    #[test]
    fn created_at_is_optional() {
        let user: User = serde_json::from_str(
            r#"{"id":"u7","name":"Bo","email":"b@x.com","created_at":"2024-01-01T00:00:00Z"}"#,
        )
        .expect("user");
        assert!(user.created_at.is_some());
        assert_eq!(user.id.to_string(), "u7");
    }
}
