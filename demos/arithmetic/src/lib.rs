//! Example model crate
//!
//! `marmot validate` builds a harness that calls [`register`] and checks every
//! model it registers.

use marmot::{EntryPoint, FactoryError, Kwargs, Model, ModelError, Registry};
use serde_json::{json, Value};

/// Sums an array of numbers, scaled by the `scale` kwarg
pub struct Sum {
    scale: f64,
}

impl Model for Sum {
    fn dummy_input(&self) -> Option<Value> {
        Some(json!([2, 3]))
    }

    fn dummy_output(&self) -> Option<Value> {
        Some(json!(5.0 * self.scale))
    }

    fn get_output(&self, input: &Value) -> Result<Value, ModelError> {
        let items = input
            .as_array()
            .ok_or_else(|| ModelError::InvalidInput(format!("expected an array, got {input}")))?;

        let mut total = 0.0;
        for item in items {
            total += item
                .as_f64()
                .ok_or_else(|| ModelError::InvalidInput(format!("not a number: {item}")))?;
        }
        Ok(json!(total * self.scale))
    }
}

fn sum(kwargs: &Kwargs) -> Result<Box<dyn Model>, FactoryError> {
    let scale = match kwargs.get("scale") {
        Some(value) => value
            .as_f64()
            .ok_or_else(|| FactoryError::InvalidArguments(format!("scale must be a number, got {value}")))?,
        None => 1.0,
    };
    Ok(Box::new(Sum { scale }))
}

pub fn register(registry: &mut Registry) -> marmot::Result<()> {
    registry.with_namespace("arithmetic", |registry| -> marmot::Result<()> {
        registry.register("sum-v1", EntryPoint::factory(sum), Kwargs::new())?;

        let mut doubled = Kwargs::new();
        doubled.insert("scale".to_string(), json!(2.0));
        registry.register("sum-v2", EntryPoint::factory(sum), doubled)?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_sum_is_doubled() {
        let mut marmot = marmot::Marmot::new();
        register(marmot.registry_mut()).unwrap();

        let model = marmot.load("arithmetic/sum", Kwargs::new()).unwrap();
        assert_eq!(model.id(), "arithmetic/sum-v2");
        assert_eq!(model.get_output(&json!([2, 3])).unwrap(), json!(10.0));
    }
}
