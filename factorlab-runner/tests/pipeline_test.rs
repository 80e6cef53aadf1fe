//! End-to-end runner tests on synthetic quotes: config in, result out.

use factorlab_runner::{
    run_backtest, run_sweep, synthetic_quotes, ExitConfig, ParamGrid, RunConfig, SignalConfig,
    WeightConfig,
};

fn base_config() -> RunConfig {
    RunConfig {
        signal: SignalConfig::CrossMa { window: 10 },
        exit: Some(ExitConfig::FixHp { fix_hp: 8 }),
        weight: WeightConfig::Ew,
        commission: 2e-4,
        day_count: Some(1),
    }
}

#[test]
fn full_pipeline_runs_on_synthetic_quotes() {
    let quote = synthetic_quotes(&["cu", "rb", "zn"], 300, 11);
    let result = run_backtest(&base_config(), &quote).unwrap();

    assert_eq!(result.run_id, base_config().run_id());
    assert!(!result.daily_pnl.is_empty());
    assert!(result.daily_pnl.values().iter().all(|v| v.is_finite()));
    assert!(result.summary.counts > 0);
    // instruction counts split cleanly into sides
    assert_eq!(
        result.shoot.overall_shoot,
        result.shoot.long_shoot + result.shoot.short_shoot
    );
}

#[test]
fn config_from_toml_runs_identically_to_the_struct() {
    let quote = synthetic_quotes(&["cu", "rb"], 200, 3);
    let config = base_config();
    let text = toml::to_string(&config).unwrap();
    let parsed = RunConfig::from_toml_str(&text).unwrap();

    let a = run_backtest(&config, &quote).unwrap();
    let b = run_backtest(&parsed, &quote).unwrap();
    assert_eq!(a.run_id, b.run_id);
    assert_eq!(a.daily_pnl.values(), b.daily_pnl.values());
    assert_eq!(a.summary.counts, b.summary.counts);
}

#[test]
fn every_exit_overlay_is_dispatchable() {
    let quote = synthetic_quotes(&["cu", "rb"], 250, 19);
    let exits = [
        ExitConfig::FixHp { fix_hp: 5 },
        ExitConfig::MaxHp { max_hp: 20 },
        ExitConfig::LossBarrier {
            takeprofit: Some(0.05),
            stoploss: Some(0.03),
            max_hp: Some(40),
        },
        ExitConfig::AtrBarrier {
            atr_period: 14,
            takeprofit_multiplier: None,
            stoploss_multiplier: Some(2.0),
            max_hp: Some(40),
        },
        ExitConfig::TraceExit {
            stoploss: 0.04,
            max_hp: 30,
        },
        ExitConfig::TraceAtrExit {
            atr_period: 14,
            atr_multiplier: 2.5,
            max_hp: 30,
        },
        ExitConfig::LimitHp {
            min_hp: 2,
            max_hp: 25,
        },
    ];
    for exit in exits {
        let mut config = base_config();
        config.exit = Some(exit.clone());
        let result = run_backtest(&config, &quote)
            .unwrap_or_else(|e| panic!("exit {exit:?} failed: {e}"));
        assert!(result.daily_pnl.values().iter().all(|v| v.is_finite()));
    }
}

#[test]
fn every_weight_scheme_is_dispatchable() {
    let quote = synthetic_quotes(&["cu", "rb", "zn"], 300, 23);
    let weights = [
        WeightConfig::Ew,
        WeightConfig::StdRatio {
            window: 50,
            target: 0.2,
            n: 3,
        },
        WeightConfig::StdMinus {
            window: 50,
            n: 3,
            std_min: 0.1,
            std_max: 0.45,
        },
        WeightConfig::StdCorr {
            window: 50,
            n: 3,
            thres_min: 0.1,
            thres_max: 0.6,
        },
        WeightConfig::ThreeD {
            window: 50,
            n: 3,
            thres_min: 0.1,
            thres_max: 0.6,
        },
    ];
    for weight in weights {
        let mut config = base_config();
        config.weight = weight.clone();
        let result = run_backtest(&config, &quote)
            .unwrap_or_else(|e| panic!("weight {weight:?} failed: {e}"));
        assert!(result.daily_pnl.values().iter().all(|v| v.is_finite()));
    }
}

#[test]
fn day_count_is_inferred_when_unset() {
    let quote = synthetic_quotes(&["cu", "rb"], 200, 5);
    let mut explicit = base_config();
    explicit.day_count = Some(1); // daily synthetic bars
    let mut inferred = base_config();
    inferred.day_count = None;

    let a = run_backtest(&explicit, &quote).unwrap();
    let b = run_backtest(&inferred, &quote).unwrap();
    assert_eq!(a.summary.avg_hp, b.summary.avg_hp);
    assert_eq!(a.summary.counts, b.summary.counts);
}

#[test]
fn sweep_runs_the_whole_grid_and_ranks_it() {
    let quote = synthetic_quotes(&["cu", "rb"], 250, 29);
    let grid = ParamGrid {
        windows: vec![5, 10, 20],
        std_multipliers: vec![],
        fix_hps: vec![4, 8],
    };
    let configs = grid.generate_configs(&base_config());
    assert_eq!(configs.len(), 6);

    let results = run_sweep(&configs, &quote).unwrap();
    assert_eq!(results.len(), 6);
    for config in &configs {
        assert!(results.get(&config.run_id()).is_some());
    }
    let ranked = results.sorted_by_sharpe();
    for pair in ranked.windows(2) {
        assert!(pair[0].summary.sharpe >= pair[1].summary.sharpe);
    }
    assert_eq!(results.best().unwrap().run_id, ranked[0].run_id);
}

#[test]
fn result_serializes_to_json() {
    let quote = synthetic_quotes(&["cu"], 150, 31);
    let result = run_backtest(&base_config(), &quote).unwrap();
    let json = result.to_json();
    assert!(json.contains("\"schema_version\": 1"));
    assert!(json.contains(&result.run_id));
}
