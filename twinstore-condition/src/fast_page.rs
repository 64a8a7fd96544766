use crate::pagination::{Direction, Pagination};
use crate::predicate::{Logic, Predicate};

/// The keyset-based fast-page protocol, factored out of both builders since
/// it is pure condition-tree manipulation: given the pagination sentinels,
/// produce the extra WHERE predicate and the effective sort direction, then
/// let each dialect render it normally.
pub struct FastPagePlan {
    pub extra_predicate: Option<Predicate>,
    pub effective_sort: Direction,
}

/// Returns `None` when `pagination.is_fast_page` is false or no key was set.
pub fn plan_fast_page(pagination: &Pagination) -> Option<FastPagePlan> {
    if !pagination.is_fast_page {
        return None;
    }
    let key = pagination.fast_page_key.clone()?;
    let sort = pagination.fast_page_sort.unwrap_or(Direction::Asc);
    let [prev_id, last_id] = pagination.fast_page_param;

    if prev_id == 0 && last_id == 0 {
        return Some(FastPagePlan {
            extra_predicate: None,
            effective_sort: sort,
        });
    }

    let plan = match sort {
        Direction::Desc => {
            if prev_id > 0 {
                FastPagePlan {
                    extra_predicate: Some(Predicate::cmp(key, Logic::Gt, prev_id)),
                    effective_sort: Direction::Asc,
                }
            } else {
                FastPagePlan {
                    extra_predicate: Some(Predicate::cmp(key, Logic::Lt, last_id)),
                    effective_sort: Direction::Desc,
                }
            }
        }
        Direction::Asc => {
            if prev_id > 0 {
                FastPagePlan {
                    extra_predicate: Some(Predicate::cmp(key, Logic::Lt, prev_id)),
                    effective_sort: Direction::Desc,
                }
            } else {
                FastPagePlan {
                    extra_predicate: Some(Predicate::cmp(key, Logic::Gt, last_id)),
                    effective_sort: Direction::Asc,
                }
            }
        }
    };
    Some(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_has_no_extra_predicate() {
        let p = Pagination::fast_page("id", Direction::Desc, 3, 0, 0);
        let plan = plan_fast_page(&p).unwrap();
        assert!(plan.extra_predicate.is_none());
        assert_eq!(plan.effective_sort, Direction::Desc);
    }

    #[test]
    fn forward_from_desc_flips_to_asc_scan() {
        // prev=0, last=8, DESC base -> k < 8, keep DESC (scenario 3, "next forward call").
        let p = Pagination::fast_page("id", Direction::Desc, 3, 0, 8);
        let plan = plan_fast_page(&p).unwrap();
        assert_eq!(plan.effective_sort, Direction::Desc);
        match plan.extra_predicate.unwrap() {
            Predicate::Cmp { logic, .. } => assert_eq!(logic, Logic::Lt),
            _ => panic!("expected Cmp"),
        }
    }

    #[test]
    fn backward_from_desc_flips_to_asc() {
        // prev=8, last=0, DESC base -> k > 8, flip to ASC (scenario 3, "previous call").
        let p = Pagination::fast_page("id", Direction::Desc, 3, 8, 0);
        let plan = plan_fast_page(&p).unwrap();
        assert_eq!(plan.effective_sort, Direction::Asc);
        match plan.extra_predicate.unwrap() {
            Predicate::Cmp { logic, .. } => assert_eq!(logic, Logic::Gt),
            _ => panic!("expected Cmp"),
        }
    }
}
