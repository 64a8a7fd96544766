use twinstore_condition::Cnd;

/// `skip`/`limit` for a Mongo `find`, computed the same way C7 computes a
/// MySQL `LIMIT` offset. The keyset fast-page protocol never skips: it scans
/// strictly forward or backward from a sentinel, so `skip` stays `None` and
/// only `limit` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct PagePlan {
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

/// `limit_size` takes precedence over pagination when both are set, mirroring
/// the SQL builder's `LIMIT n` escape hatch.
pub fn plan_page(cnd: &Cnd) -> PagePlan {
    if let Some(n) = cnd.limit_size {
        return PagePlan { skip: None, limit: Some(n as i64) };
    }

    let p = &cnd.pagination;
    if p.is_fast_page {
        return PagePlan { skip: None, limit: Some(p.page_size as i64) };
    }
    if p.is_page {
        let skip = if p.is_offset {
            p.page_no
        } else {
            p.page_no.saturating_sub(1) * p.page_size
        };
        return PagePlan { skip: Some(skip), limit: Some(p.page_size as i64) };
    }

    PagePlan::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_page_computes_skip() {
        let cnd = Cnd::new().offset(3, 10);
        let plan = plan_page(&cnd);
        assert_eq!(plan.skip, Some(20));
        assert_eq!(plan.limit, Some(10));
    }

    #[test]
    fn raw_offset_is_used_verbatim() {
        let cnd = Cnd::new().raw_offset(42, 10);
        let plan = plan_page(&cnd);
        assert_eq!(plan.skip, Some(42));
    }

    #[test]
    fn limit_size_overrides_pagination() {
        let cnd = Cnd::new().offset(3, 10).limit(5);
        let plan = plan_page(&cnd);
        assert_eq!(plan.skip, None);
        assert_eq!(plan.limit, Some(5));
    }

    #[test]
    fn fast_page_never_skips() {
        let cnd = Cnd::new().fast_page("id", twinstore_condition::Direction::Desc, 20, 0, 0);
        let plan = plan_page(&cnd);
        assert_eq!(plan.skip, None);
        assert_eq!(plan.limit, Some(20));
    }
}
