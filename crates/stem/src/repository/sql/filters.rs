use super::SqlRepository;
use crate::{
    filter::{Affix, Compare, Contains, Equals, FilterContext, FilterVisitor, OneOf},
    Value,
};
use stem_core::{
    schema::{Column, ColumnType},
    stmt::{ColumnRef, CompareOp, NamedParams, WhereExpression},
};

/// A filter column path resolved against the statement being built.
struct Resolved<'a> {
    column_ref: ColumnRef,
    column: &'a Column,

    /// Relationship to join, for a dotted path
    relationship: Option<String>,
}

/// Resolves `path` to a column of the model or of a model one relationship
/// away. Declines many-to-many paths, to-many paths beneath a `Not`, a
/// second leaf on an already joined to-many relationship and anything deeper
/// than one relationship.
///
/// Every leaf on a relationship tests the one row the join produced, while
/// in-memory evaluation lets each leaf match a different related model; the
/// two only agree for one leaf per to-many relationship.
fn resolve<'a>(cx: &FilterContext<'a>, path: &str) -> Option<Resolved<'a>> {
    let Some((name, rest)) = path.split_once('.') else {
        let column = cx.model.get_column(path)?;
        return Some(Resolved {
            column_ref: ColumnRef::new(&cx.alias, path),
            column,
            relationship: None,
        });
    };

    if rest.contains('.') {
        return None;
    }

    let relationship = cx.model.relationship(name)?;

    if relationship.is_many_to_many() {
        return None;
    }

    if !relationship.is_to_one()
        && (cx.is_negated() || cx.relationships_to_auto_hydrate.contains(name))
    {
        return None;
    }

    let target = cx.db.schema().model(&relationship.target_model).ok()?;
    let column = target.get_column(rest)?;

    Some(Resolved {
        column_ref: ColumnRef::new(name, rest),
        column,
        relationship: Some(name.to_string()),
    })
}

/// Commits a translated leaf: records the relationship it reached and, under
/// a `Not`, makes the fragment null safe so the negation matches rows whose
/// value is missing the same way in-memory evaluation does.
fn accept(cx: &mut FilterContext<'_>, resolved: Resolved<'_>, expr: WhereExpression) -> WhereExpression {
    if let Some(relationship) = resolved.relationship {
        cx.relationships_to_auto_hydrate.insert(relationship);
    }

    if !cx.is_negated() {
        return expr;
    }

    WhereExpression::And(vec![
        expr,
        WhereExpression::IsNull {
            column: resolved.column_ref,
            negated: true,
        },
    ])
}

fn bind(params: &mut NamedParams, resolved: &Resolved<'_>, value: &Value) -> Option<String> {
    let value = resolved.column.to_storage(value).ok()?;
    Some(params.add(&resolved.column_ref.column, value))
}

/// Escapes the `LIKE` wildcards of `text`; `\` is the escape character.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl SqlRepository {
    fn like(
        &self,
        cx: &mut FilterContext<'_>,
        path: &str,
        pattern: String,
        params: &mut NamedParams,
    ) -> Option<WhereExpression> {
        // LIKE folds ASCII letters only.
        if !pattern.is_ascii() {
            return None;
        }

        let resolved = resolve(cx, path)?;

        if matches!(resolved.column.ty, ColumnType::Float | ColumnType::Boolean) {
            return None;
        }

        let param = params.add(&resolved.column_ref.column, pattern);
        let expr = WhereExpression::Like {
            column: resolved.column_ref.clone(),
            param,
        };
        Some(accept(cx, resolved, expr))
    }

    fn compare(
        &self,
        cx: &mut FilterContext<'_>,
        filter: &Compare,
        op: CompareOp,
        params: &mut NamedParams,
    ) -> Option<WhereExpression> {
        if filter.value.is_null() {
            return None;
        }

        let resolved = resolve(cx, &filter.column)?;
        let param = bind(params, &resolved, &filter.value)?;
        let expr = WhereExpression::compare(resolved.column_ref.clone(), op, param);
        Some(accept(cx, resolved, expr))
    }
}

impl FilterVisitor for SqlRepository {
    fn visit_equals(
        &self,
        cx: &mut FilterContext<'_>,
        filter: &Equals,
        params: &mut NamedParams,
    ) -> Option<WhereExpression> {
        let resolved = resolve(cx, &filter.column)?;

        if filter.value.is_null() {
            let expr = WhereExpression::IsNull {
                column: resolved.column_ref.clone(),
                negated: false,
            };

            // `NOT (x IS NULL)` needs no extra guard.
            if let Some(relationship) = resolved.relationship {
                cx.relationships_to_auto_hydrate.insert(relationship);
            }
            return Some(expr);
        }

        let param = bind(params, &resolved, &filter.value)?;
        let expr = WhereExpression::compare(resolved.column_ref.clone(), CompareOp::Eq, param);
        Some(accept(cx, resolved, expr))
    }

    fn visit_contains(
        &self,
        cx: &mut FilterContext<'_>,
        filter: &Contains,
        params: &mut NamedParams,
    ) -> Option<WhereExpression> {
        // LIKE is case insensitive.
        if filter.case_sensitive {
            return None;
        }

        let pattern = format!("%{}%", escape_like(&filter.needle));
        self.like(cx, &filter.column, pattern, params)
    }

    fn visit_one_of(
        &self,
        cx: &mut FilterContext<'_>,
        filter: &OneOf,
        params: &mut NamedParams,
    ) -> Option<WhereExpression> {
        if filter.values.iter().any(Value::is_null) {
            return None;
        }

        let resolved = resolve(cx, &filter.column)?;
        let mark = params.len();
        let mut names = Vec::with_capacity(filter.values.len());

        for value in &filter.values {
            match bind(params, &resolved, value) {
                Some(name) => names.push(name),
                None => {
                    params.truncate(mark);
                    return None;
                }
            }
        }

        let expr = WhereExpression::In {
            column: resolved.column_ref.clone(),
            params: names,
        };
        Some(accept(cx, resolved, expr))
    }

    fn visit_greater_than(
        &self,
        cx: &mut FilterContext<'_>,
        filter: &Compare,
        params: &mut NamedParams,
    ) -> Option<WhereExpression> {
        let op = if filter.inclusive { CompareOp::Ge } else { CompareOp::Gt };
        self.compare(cx, filter, op, params)
    }

    fn visit_less_than(
        &self,
        cx: &mut FilterContext<'_>,
        filter: &Compare,
        params: &mut NamedParams,
    ) -> Option<WhereExpression> {
        let op = if filter.inclusive { CompareOp::Le } else { CompareOp::Lt };
        self.compare(cx, filter, op, params)
    }

    fn visit_starts_with(
        &self,
        cx: &mut FilterContext<'_>,
        filter: &Affix,
        params: &mut NamedParams,
    ) -> Option<WhereExpression> {
        let pattern = format!("{}%", escape_like(&filter.affix));
        self.like(cx, &filter.column, pattern, params)
    }

    fn visit_ends_with(
        &self,
        cx: &mut FilterContext<'_>,
        filter: &Affix,
        params: &mut NamedParams,
    ) -> Option<WhereExpression> {
        let pattern = format!("%{}", escape_like(&filter.affix));
        self.like(cx, &filter.column, pattern, params)
    }
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
