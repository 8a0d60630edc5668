use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A render-pipeline state element.
///
/// Implemented for every `PartialEq + Debug` type, so modifiers are plain
/// value structs. Equality across the trait object compares concrete type
/// first, then value.
pub trait PipeOp: Any + fmt::Debug + Send + Sync {
    /// Upcast for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Structural equality against another op.
    fn op_eq(&self, other: &dyn PipeOp) -> bool;
}

impl<T> PipeOp for T
where
    T: Any + fmt::Debug + PartialEq + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn op_eq(&self, other: &dyn PipeOp) -> bool {
        other.as_any().downcast_ref::<T>().is_some_and(|o| self == o)
    }
}

/// Shared pipeline op.
pub type Op = Arc<dyn PipeOp>;

/// Equality over optional ops.
#[must_use]
pub fn op_eq(a: Option<&Op>, b: Option<&Op>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b) || (**a).op_eq(&**b),
        _ => false,
    }
}

/// Ordered composition of ops.
#[derive(Debug, Clone)]
pub struct Composed(pub Vec<Op>);

impl PartialEq for Composed {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(&other.0)
                .all(|(a, b)| op_eq(Some(a), Some(b)))
    }
}

/// Composes ops in order. Nothing to compose yields `None`.
#[must_use]
pub fn compose(ops: Vec<Op>) -> Option<Op> {
    if ops.is_empty() {
        None
    } else {
        Some(Arc::new(Composed(ops)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Tint(u8);

    #[derive(Debug, PartialEq)]
    struct Depth(u8);

    #[test]
    fn test_op_equality_is_typed() {
        let a: Op = Arc::new(Tint(1));
        let b: Op = Arc::new(Tint(1));
        let c: Op = Arc::new(Depth(1));
        assert!(op_eq(Some(&a), Some(&b)));
        assert!(!op_eq(Some(&a), Some(&c)));
        assert!(!op_eq(Some(&a), None));
        assert!(op_eq(None, None));
    }

    #[test]
    fn test_composition_order_matters() {
        let ab = compose(vec![Arc::new(Tint(1)) as Op, Arc::new(Depth(2))]);
        let ab2 = compose(vec![Arc::new(Tint(1)) as Op, Arc::new(Depth(2))]);
        let ba = compose(vec![Arc::new(Depth(2)) as Op, Arc::new(Tint(1))]);
        assert!(op_eq(ab.as_ref(), ab2.as_ref()));
        assert!(!op_eq(ab.as_ref(), ba.as_ref()));
        assert!(compose(Vec::new()).is_none());
    }
}
