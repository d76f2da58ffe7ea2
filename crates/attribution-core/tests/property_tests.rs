use attribution_core::{
    brinson_topdown, modified_frongello, run_attribution, AttributionConfig, AttributionInput,
    Holding, PeriodInput, Snapshot,
};
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Returns between -50% and +50% in basis points.
fn rate() -> impl Strategy<Value = Decimal> {
    (-5000i64..5000).prop_map(|bp| Decimal::new(bp, 4))
}

/// Weight split of two categories summing to 1.
fn split() -> impl Strategy<Value = (Decimal, Decimal)> {
    (0i64..=100).prop_map(|pct| {
        let w = Decimal::new(pct, 2);
        (w, Decimal::ONE - w)
    })
}

fn snapshot(rows: &[(&str, Decimal, Decimal)], period: Option<NaiveDate>) -> Snapshot {
    Snapshot::new(
        rows.iter()
            .map(|(id, w, r)| Holding {
                security: id.to_string(),
                weight: *w,
                return_: *r,
                category: id.to_string(),
            })
            .collect(),
        period,
    )
    .unwrap()
}

proptest! {
    #[test]
    fn prop_single_period_is_additive(
        (pa, pb) in split(),
        (ba, bb) in split(),
        rpa in rate(), rpb in rate(), rba in rate(), rbb in rate(),
    ) {
        let p = snapshot(&[("A", pa, rpa), ("B", pb, rpb)], None);
        let b = snapshot(&[("A", ba, rba), ("B", bb, rbb)], None);
        let out = brinson_topdown(&p, &b).unwrap();

        for row in out.effects.rows() {
            prop_assert_eq!(row.total, row.allocation + row.selection_interaction);
        }
        let summed: Decimal = out.effects.categories.iter().map(|r| r.total).sum();
        prop_assert_eq!(summed, out.effects.total.total);
        // Weights on both sides sum to 1, so the total effect is the excess return
        prop_assert_eq!(out.effects.total.total, out.excess_return);
    }

    #[test]
    fn prop_first_period_identity(raw in rate(), rp in rate(), rb in rate()) {
        let linked = modified_frongello(raw, &[], &[], rp, rb, &[]).unwrap();
        prop_assert_eq!(linked, raw);
    }

    #[test]
    fn prop_zero_weight_security_has_no_effect(
        w in 1i64..100,
        r in rate(),
        noise in -1_000_000i64..1_000_000,
    ) {
        let w = Decimal::new(w, 2);
        let base = vec![Holding {
            security: "A".into(),
            weight: w,
            return_: r,
            category: "Core".into(),
        }];
        let mut noisy = base.clone();
        noisy.push(Holding {
            security: "Z".into(),
            weight: Decimal::ZERO,
            return_: Decimal::new(noise, 2),
            category: "Core".into(),
        });
        let base = Snapshot::new(base, None).unwrap();
        let noisy = Snapshot::new(noisy, None).unwrap();

        prop_assert_eq!(base.total_return().unwrap(), noisy.total_return().unwrap());
        prop_assert_eq!(base.weights_by_category().unwrap(), noisy.weights_by_category().unwrap());
        prop_assert_eq!(base.returns_by_category().unwrap(), noisy.returns_by_category().unwrap());
    }

    #[test]
    fn prop_linked_total_equals_compounded_excess(
        periods in prop::collection::vec((split(), split(), rate(), rate(), rate(), rate()), 1..6)
    ) {
        let start = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
        let inputs: Vec<PeriodInput> = periods
            .iter()
            .enumerate()
            .map(|(i, ((pa, pb), (ba, bb), rpa, rpb, rba, rbb))| {
                let d = start + Duration::days(31 * i as i64);
                PeriodInput {
                    period: d,
                    portfolio: snapshot(&[("A", *pa, *rpa), ("B", *pb, *rpb)], Some(d)),
                    benchmark: snapshot(&[("A", *ba, *rba), ("B", *bb, *rbb)], Some(d)),
                }
            })
            .collect();

        let out = run_attribution(
            &AttributionInput::MultiPeriod { periods: inputs },
            &AttributionConfig::default(),
        )
        .unwrap();
        let report = out.result;

        prop_assert!(report.residual.abs() < dec!(0.000000000001), "residual {}", report.residual);
        let cats: Decimal = report.summary.categories.iter().map(|r| r.total).sum();
        prop_assert!((cats - report.summary.total.total).abs() < dec!(0.000000000001));
    }
}
