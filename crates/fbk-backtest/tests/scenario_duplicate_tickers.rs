use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use fbk_backtest::{
    Allocation, BacktestEngine, BacktestRequest, Granularity, RebalanceStrategy,
};
use fbk_testkit::{series_of, FixedReturnsProvider};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn engine() -> BacktestEngine {
    BacktestEngine::new(Arc::new(FixedReturnsProvider::new().with_series(series_of(
        "#2X",
        Granularity::Monthly,
        d(2023, 1, 1),
        &[dec!(2), dec!(-1), dec!(0.5), dec!(3)],
    ))))
}

fn request(allocations: Vec<Allocation>) -> BacktestRequest {
    BacktestRequest {
        allocations,
        starting_balance: dec!(5000),
        granularity: Granularity::Monthly,
        first_period: d(2023, 1, 1),
        last_period: d(2023, 4, 1),
        rebalance_strategy: RebalanceStrategy::None,
        rebalance_threshold: None,
    }
}

#[test]
fn duplicate_ticker_entries_collapse_into_one_constituent() {
    let split = engine()
        .run(&request(vec![
            Allocation::new("#2X", dec!(50)),
            Allocation::new("#2X", dec!(50)),
        ]))
        .expect("split run");
    let whole = engine()
        .run(&request(vec![Allocation::new("#2X", dec!(100))]))
        .expect("whole run");

    assert_eq!(split, whole);
    assert_eq!(split.decomposed_performance.len(), 1);
    assert_eq!(split.decomposed_performance["#2X"][0].starting_balance, dec!(5000));
}

#[test]
fn uneven_duplicate_weights_also_sum() {
    let result = engine()
        .run(&request(vec![
            Allocation::new("#2X", dec!(70)),
            Allocation::new("#2X", dec!(20)),
            Allocation::new("#2X", dec!(10)),
        ]))
        .expect("run backtest");

    assert_eq!(result.decomposed_performance["#2X"][0].starting_balance, dec!(5000));
}
