//! Value and key transformers
//!
//! Transformers are partial conversions: returning `None` means the value
//! cannot be represented on the other side. How a `None` is treated depends
//! on where the transformer is used (see `value_transformation` and
//! `key_transformation`).

use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

// =============================================================================
// Transformer Traits
// =============================================================================

/// A partial conversion from `Input` to `Output`
pub trait OneWayTransformer: Send + Sync + 'static {
    type Input: Clone + Send + Sync + 'static;
    type Output: Clone + Send + Sync + 'static;

    fn transform(&self, value: &Self::Input) -> Option<Self::Output>;
}

/// A pair of partial conversions between `Input` and `Output`
pub trait TwoWayTransformer: Send + Sync + 'static {
    type Input: Clone + Send + Sync + 'static;
    type Output: Clone + Send + Sync + 'static;

    /// Convert a level's native value into the exposed value
    fn transform(&self, value: &Self::Input) -> Option<Self::Output>;

    /// Convert an exposed value back into the level's native value
    fn inverse_transform(&self, value: &Self::Output) -> Option<Self::Input>;

    /// Swap the direction of this transformer
    fn invert(self) -> Inverted<Self>
    where
        Self: Sized,
    {
        Inverted(self)
    }
}

/// A transformer running in the opposite direction
#[derive(Debug, Clone)]
pub struct Inverted<T>(T);

impl<T: TwoWayTransformer> TwoWayTransformer for Inverted<T> {
    type Input = T::Output;
    type Output = T::Input;

    fn transform(&self, value: &Self::Input) -> Option<Self::Output> {
        self.0.inverse_transform(value)
    }

    fn inverse_transform(&self, value: &Self::Output) -> Option<Self::Input> {
        self.0.transform(value)
    }
}

// =============================================================================
// Closure-Backed Transformers
// =============================================================================

type PartialFn<A, B> = Box<dyn Fn(&A) -> Option<B> + Send + Sync>;

/// One-way transformer built from a closure
pub struct OneWayTransformationBox<A, B> {
    transform: PartialFn<A, B>,
}

impl<A, B> OneWayTransformationBox<A, B> {
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(&A) -> Option<B> + Send + Sync + 'static,
    {
        Self {
            transform: Box::new(transform),
        }
    }
}

impl<A, B> OneWayTransformer for OneWayTransformationBox<A, B>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    type Input = A;
    type Output = B;

    fn transform(&self, value: &A) -> Option<B> {
        (self.transform)(value)
    }
}

impl<A, B> fmt::Debug for OneWayTransformationBox<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneWayTransformationBox").finish_non_exhaustive()
    }
}

/// Two-way transformer built from a pair of closures
pub struct TwoWayTransformationBox<A, B> {
    transform: PartialFn<A, B>,
    inverse_transform: PartialFn<B, A>,
}

impl<A, B> TwoWayTransformationBox<A, B> {
    pub fn new<F, G>(transform: F, inverse_transform: G) -> Self
    where
        F: Fn(&A) -> Option<B> + Send + Sync + 'static,
        G: Fn(&B) -> Option<A> + Send + Sync + 'static,
    {
        Self {
            transform: Box::new(transform),
            inverse_transform: Box::new(inverse_transform),
        }
    }
}

impl<A, B> TwoWayTransformer for TwoWayTransformationBox<A, B>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    type Input = A;
    type Output = B;

    fn transform(&self, value: &A) -> Option<B> {
        (self.transform)(value)
    }

    fn inverse_transform(&self, value: &B) -> Option<A> {
        (self.inverse_transform)(value)
    }
}

impl<A, B> fmt::Debug for TwoWayTransformationBox<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwoWayTransformationBox").finish_non_exhaustive()
    }
}

// =============================================================================
// Built-in Transformers
// =============================================================================

/// Raw bytes to UTF-8 strings
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Transformer;

impl TwoWayTransformer for Utf8Transformer {
    type Input = Bytes;
    type Output = String;

    fn transform(&self, value: &Bytes) -> Option<String> {
        std::str::from_utf8(value).ok().map(str::to_owned)
    }

    fn inverse_transform(&self, value: &String) -> Option<Bytes> {
        Some(Bytes::copy_from_slice(value.as_bytes()))
    }
}

/// JSON-encoded bytes to a typed value
pub struct JsonTransformer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonTransformer<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonTransformer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonTransformer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsonTransformer<{}>", std::any::type_name::<T>())
    }
}

impl<T> TwoWayTransformer for JsonTransformer<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Input = Bytes;
    type Output = T;

    fn transform(&self, value: &Bytes) -> Option<T> {
        serde_json::from_slice(value)
            .map_err(|e| debug!("JSON decode failed: {}", e))
            .ok()
    }

    fn inverse_transform(&self, value: &T) -> Option<Bytes> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| debug!("JSON encode failed: {}", e))
            .ok()
    }
}

/// Keys rendered through their `Display` implementation
pub struct DisplayKeyTransformer<A> {
    _marker: PhantomData<fn(&A)>,
}

impl<A> DisplayKeyTransformer<A> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<A> Default for DisplayKeyTransformer<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> OneWayTransformer for DisplayKeyTransformer<A>
where
    A: fmt::Display + Clone + Send + Sync + 'static,
{
    type Input = A;
    type Output = String;

    fn transform(&self, value: &A) -> Option<String> {
        Some(value.to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        id: u32,
        name: String,
    }

    fn positive_increment() -> TwoWayTransformationBox<i32, String> {
        TwoWayTransformationBox::new(
            |x: &i32| if *x > 0 { Some((x + 1).to_string()) } else { None },
            |s: &String| s.parse().ok(),
        )
    }

    #[test]
    fn test_box_transform() {
        let transformer = positive_increment();
        assert_eq!(transformer.transform(&101), Some("102".to_string()));
        assert_eq!(transformer.transform(&-3), None);
        assert_eq!(transformer.inverse_transform(&"199".to_string()), Some(199));
        assert_eq!(transformer.inverse_transform(&"will fail".to_string()), None);
    }

    #[test]
    fn test_inverted_swaps_directions() {
        let inverted = positive_increment().invert();
        assert_eq!(inverted.transform(&"7".to_string()), Some(7));
        assert_eq!(inverted.inverse_transform(&7), Some("8".to_string()));
    }

    #[test]
    fn test_utf8_transformer() {
        let transformer = Utf8Transformer;
        assert_eq!(
            transformer.transform(&Bytes::from_static(b"plain text")),
            Some("plain text".to_string())
        );
        assert_eq!(transformer.transform(&Bytes::from_static(&[0xff, 0xfe])), None);
        assert_eq!(
            transformer.inverse_transform(&"abc".to_string()),
            Some(Bytes::from_static(b"abc"))
        );
    }

    #[test]
    fn test_json_transformer() {
        let transformer = JsonTransformer::<Profile>::new();
        let profile = Profile {
            id: 7,
            name: "ada".into(),
        };

        let encoded = transformer.inverse_transform(&profile).unwrap();
        assert_eq!(transformer.transform(&encoded), Some(profile));
        assert_eq!(transformer.transform(&Bytes::from_static(b"{not json")), None);
    }

    #[test]
    fn test_display_key_transformer() {
        let transformer = DisplayKeyTransformer::<u64>::new();
        assert_eq!(transformer.transform(&42), Some("42".to_string()));
    }

    #[test]
    fn test_one_way_box() {
        let transformer = OneWayTransformationBox::new(|k: &String| k.strip_prefix("user:").map(str::to_owned));
        assert_eq!(transformer.transform(&"user:12".to_string()), Some("12".to_string()));
        assert_eq!(transformer.transform(&"group:12".to_string()), None);
    }
}
