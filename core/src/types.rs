//! Domain DTOs that callers declare as response types.
//!
//! Entity payloads pass through the client untouched; these exist so callers
//! can ask for a typed value with `ApiClient::execute_as`.

use serde::{Deserialize, Serialize};

use crate::schema::{NumberRules, Schema};

/// A currency row from `api/exchange/get-all-currency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    pub currency_id: i64,
    pub currency_code: String,
    pub base_currency: bool,
}

/// Payload for `api/exchange/add-currency`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCurrency {
    pub currency_code: String,
    #[serde(default)]
    pub base_currency: bool,
}

impl Currency {
    pub fn schema() -> Schema {
        Schema::object([
            ("currencyId", Schema::Number(NumberRules::default().coerce().integer())),
            ("currencyCode", Schema::string()),
            ("baseCurrency", Schema::boolean()),
        ])
    }

    pub fn list_schema() -> Schema {
        Schema::array(Self::schema())
    }
}
