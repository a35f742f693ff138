use crate::{Result, Value};

/// Receives field values from an object, one call per field index.
///
/// Non-nullable primitive fields arrive through their typed method, string
/// fields through [`store_string`](FieldConsumer::store_string) and every
/// other field through [`store_object`](FieldConsumer::store_object).
pub trait FieldConsumer {
    fn store_bool(&mut self, field: usize, value: bool) -> Result<()>;

    fn store_i8(&mut self, field: usize, value: i8) -> Result<()>;

    fn store_i16(&mut self, field: usize, value: i16) -> Result<()>;

    fn store_i32(&mut self, field: usize, value: i32) -> Result<()>;

    fn store_i64(&mut self, field: usize, value: i64) -> Result<()>;

    fn store_f32(&mut self, field: usize, value: f32) -> Result<()>;

    fn store_f64(&mut self, field: usize, value: f64) -> Result<()>;

    fn store_char(&mut self, field: usize, value: char) -> Result<()>;

    fn store_string(&mut self, field: usize, value: Option<&str>) -> Result<()>;

    fn store_object(&mut self, field: usize, value: &Value) -> Result<()>;
}

/// Supplies field values to an object, one call per field index. The
/// counterpart of [`FieldConsumer`].
pub trait FieldSupplier {
    fn fetch_bool(&mut self, field: usize) -> Result<bool>;

    fn fetch_i8(&mut self, field: usize) -> Result<i8>;

    fn fetch_i16(&mut self, field: usize) -> Result<i16>;

    fn fetch_i32(&mut self, field: usize) -> Result<i32>;

    fn fetch_i64(&mut self, field: usize) -> Result<i64>;

    fn fetch_f32(&mut self, field: usize) -> Result<f32>;

    fn fetch_f64(&mut self, field: usize) -> Result<f64>;

    fn fetch_char(&mut self, field: usize) -> Result<char>;

    fn fetch_string(&mut self, field: usize) -> Result<Option<String>>;

    fn fetch_object(&mut self, field: usize) -> Result<Value>;
}
