use bson::Document;

use twinstore_condition::Cnd;

use crate::filter::id_field_for;

/// Merges `any_fields` (include=1) and `any_not_fields` (exclude=0),
/// rewriting `id` to `_id`. Mongo projections cannot mix include and
/// exclude (outside of `_id`), so `any_fields` wins when both are set — the
/// same precedence the condition tree's doc comments imply by listing
/// `any_fields` first.
pub fn render_projection(cnd: &Cnd) -> Option<Document> {
    if !cnd.any_fields.is_empty() {
        let mut doc = Document::new();
        for field in &cnd.any_fields {
            doc.insert(id_field_for(field), 1);
        }
        return Some(doc);
    }

    if !cnd.any_not_fields.is_empty() {
        let mut doc = Document::new();
        for field in &cnd.any_not_fields {
            doc.insert(id_field_for(field), 0);
        }
        return Some(doc);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_fields_renders_include_projection() {
        let cnd = Cnd::new().any_field("id").any_field("name");
        let doc = render_projection(&cnd).unwrap();
        assert_eq!(doc.get_i32("_id").unwrap(), 1);
        assert_eq!(doc.get_i32("name").unwrap(), 1);
    }

    #[test]
    fn any_not_fields_renders_exclude_projection() {
        let cnd = Cnd::new().any_not_field("secret");
        let doc = render_projection(&cnd).unwrap();
        assert_eq!(doc.get_i32("secret").unwrap(), 0);
    }

    #[test]
    fn no_fields_yields_no_projection() {
        let cnd = Cnd::new();
        assert!(render_projection(&cnd).is_none());
    }
}
