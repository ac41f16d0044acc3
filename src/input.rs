use crate::error::Error;
use crate::schema::SchemaBuilder;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

/// Access to the concrete type behind a trait object.
///
/// Implemented for every `'static` type, so implementors never write it.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A payload offered to an input reactor.
///
/// Reactors look for the concrete input types they understand with
/// [`as_input`]. An input may expose an alternate view of itself through
/// [`Input::input`], which lets a wrapper present whatever it wraps to
/// reactors that only know the inner type.
pub trait Input: AsAny + fmt::Debug + Send + Sync {
    fn kind(&self) -> &'static str;

    /// Shape of the JSON this input is parsed from.
    fn json_schema(&self) -> SchemaBuilder;

    /// The next view in the unwrap chain, if any.
    fn input(&self) -> Option<&dyn Input> {
        None
    }
}

/// Projects `input` onto the concrete type `T`.
///
/// The input itself is tried first, then each view reachable through
/// [`Input::input`] in turn.
///
/// ```
/// use authflow_engine::{as_input, Input, SchemaBuilder};
///
/// #[derive(Debug)]
/// struct LoginId(String);
///
/// impl Input for LoginId {
///     fn kind(&self) -> &'static str { "LoginId" }
///     fn json_schema(&self) -> SchemaBuilder { SchemaBuilder::new() }
/// }
///
/// #[derive(Debug)]
/// struct Wrapped(LoginId);
///
/// impl Input for Wrapped {
///     fn kind(&self) -> &'static str { "Wrapped" }
///     fn json_schema(&self) -> SchemaBuilder { SchemaBuilder::new() }
///     fn input(&self) -> Option<&dyn Input> { Some(&self.0) }
/// }
///
/// let wrapped = Wrapped(LoginId("user@example.com".into()));
/// let login_id = as_input::<LoginId>(&wrapped).map(|l| l.0.as_str());
/// assert_eq!(login_id, Some("user@example.com"));
/// ```
pub fn as_input<T: Input>(input: &dyn Input) -> Option<&T> {
    let mut current = Some(input);
    while let Some(view) = current {
        if let Some(target) = view.as_any().downcast_ref::<T>() {
            return Some(target);
        }
        current = view.input();
    }
    None
}

/// What a reactor declares it can take, and how to build it from raw JSON.
pub trait InputSchema: Send + Sync {
    fn schema_builder(&self) -> SchemaBuilder;

    fn make_input(&self, raw: &Value) -> Result<Box<dyn Input>, Error>;
}

impl fmt::Debug for dyn InputSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InputSchema")
            .field(&self.schema_builder())
            .finish()
    }
}

/// [`InputSchema`] for a single concrete input type.
///
/// Raw JSON is validated against `T::default().json_schema()` before it is
/// deserialized into `T`.
pub struct Accepts<T>(PhantomData<fn() -> T>);

impl<T> Accepts<T>
where
    T: Input + DeserializeOwned + Default,
{
    pub fn new() -> Self {
        Self(PhantomData)
    }

    pub fn boxed() -> Box<dyn InputSchema> {
        Box::new(Self::new())
    }
}

impl<T> Default for Accepts<T>
where
    T: Input + DeserializeOwned + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> InputSchema for Accepts<T>
where
    T: Input + DeserializeOwned + Default,
{
    fn schema_builder(&self) -> SchemaBuilder {
        T::default().json_schema()
    }

    fn make_input(&self, raw: &Value) -> Result<Box<dyn Input>, Error> {
        let prototype = T::default();
        let input: T = prototype.json_schema().parse(prototype.kind(), raw)?;
        Ok(Box::new(input))
    }
}
