use super::{Affix, Compare, Contains, Equals, FilterContext, OneOf};
use stem_core::stmt::{NamedParams, WhereExpression};

/// Translation of filter leaves into where-expression fragments.
///
/// [`Filter`](super::Filter) dispatches each leaf to the matching method. A
/// method returns the single fragment the leaf translates to, binding any
/// values into `params`, or `None` to decline. The default implementations
/// decline everything, so a backend only overrides what it can express.
///
/// A method that declines must not leave bindings behind in `params`.
#[allow(unused_variables)]
pub trait FilterVisitor {
    fn visit_equals(
        &self,
        cx: &mut FilterContext<'_>,
        filter: &Equals,
        params: &mut NamedParams,
    ) -> Option<WhereExpression> {
        None
    }

    fn visit_contains(
        &self,
        cx: &mut FilterContext<'_>,
        filter: &Contains,
        params: &mut NamedParams,
    ) -> Option<WhereExpression> {
        None
    }

    fn visit_one_of(
        &self,
        cx: &mut FilterContext<'_>,
        filter: &OneOf,
        params: &mut NamedParams,
    ) -> Option<WhereExpression> {
        None
    }

    fn visit_greater_than(
        &self,
        cx: &mut FilterContext<'_>,
        filter: &Compare,
        params: &mut NamedParams,
    ) -> Option<WhereExpression> {
        None
    }

    fn visit_less_than(
        &self,
        cx: &mut FilterContext<'_>,
        filter: &Compare,
        params: &mut NamedParams,
    ) -> Option<WhereExpression> {
        None
    }

    fn visit_starts_with(
        &self,
        cx: &mut FilterContext<'_>,
        filter: &Affix,
        params: &mut NamedParams,
    ) -> Option<WhereExpression> {
        None
    }

    fn visit_ends_with(
        &self,
        cx: &mut FilterContext<'_>,
        filter: &Affix,
        params: &mut NamedParams,
    ) -> Option<WhereExpression> {
        None
    }
}
