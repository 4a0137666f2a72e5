//! The quickstart record.

use serde::{Deserialize, Serialize};

use crate::error::OrmError;
use crate::model::{Model, ModelBase};
use crate::schema::{ColumnDefinition, DataType, DefaultValue};
use crate::value::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(flatten)]
    pub base: ModelBase,
    pub code: String,
    pub price: u32,
}

impl Product {
    pub fn new(code: impl Into<String>, price: u32) -> Self {
        Self {
            code: code.into(),
            price,
            ..Default::default()
        }
    }

    pub fn id(&self) -> i64 {
        self.base.id
    }
}

impl Model for Product {
    const TABLE: &'static str = "products";

    fn fields() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("code", DataType::Text)
                .not_null()
                .with_default(DefaultValue::Text(String::new())),
            ColumnDefinition::new("price", DataType::Integer)
                .not_null()
                .with_default(DefaultValue::Integer(0)),
        ]
    }

    fn base(&self) -> &ModelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModelBase {
        &mut self.base
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("code", Value::from(self.code.as_str())),
            ("price", Value::from(self.price)),
        ]
    }

    fn set_value(&mut self, column: &str, value: Value) -> Result<(), OrmError> {
        match column {
            "code" => self.code = value.into_text(column)?,
            "price" => self.price = value.into_integer(column)?,
            _ => {
                return Err(OrmError::UnknownColumn {
                    table: Self::TABLE,
                    column: column.to_string(),
                })
            }
        }
        Ok(())
    }
}
