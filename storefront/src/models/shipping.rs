// storefront/src/models/shipping.rs

use serde::{Deserialize, Serialize};

/// Captured with the order and never edited. Stored as JSON with camelCase keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
  #[serde(default, alias = "first_name")]
  pub first_name: String,
  #[serde(default, alias = "last_name")]
  pub last_name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub phone: String,
  #[serde(default)]
  pub address: String,
  #[serde(default)]
  pub city: String,
  #[serde(default, alias = "zip_code")]
  pub zip_code: String,
  #[serde(default)]
  pub country: String,
}

impl ShippingAddress {
  /// Names of required fields that are blank after trimming. `zipCode` is optional.
  pub fn missing_fields(&self) -> Vec<&'static str> {
    [
      ("firstName", &self.first_name),
      ("lastName", &self.last_name),
      ("email", &self.email),
      ("phone", &self.phone),
      ("address", &self.address),
      ("city", &self.city),
      ("country", &self.country),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect()
  }
}
