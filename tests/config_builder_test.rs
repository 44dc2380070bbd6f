//! Integration tests for configuration parsing and pool construction.

use tickbase::{build_pools, Poolable, PoolSettings, RuntimeConfig};

#[derive(Default)]
struct Frame {
    payload: Vec<u8>,
}

impl Poolable for Frame {
    fn on_reclaimed(&mut self) {
        self.payload.clear();
    }
}

fn sample_config() -> RuntimeConfig {
    RuntimeConfig::from_json_str(
        r#"{
            "tick_interval_ms": 50,
            "pools": {
                "frames": { "prealloc": 8, "max_idle": 32 },
                "sessions": { "max_idle": 4 }
            }
        }"#,
    )
    .expect("sample config is valid")
}

#[test]
fn pools_are_built_per_config_entry() {
    let cfg = sample_config();
    let pools = build_pools(&cfg, |_name, _settings| {
        Ok(Box::new(Frame::default) as Box<dyn Fn() -> Frame + Send + Sync>)
    })
    .expect("pools build from a valid config");

    assert_eq!(pools.len(), 2);
    let frames = &pools["frames"];
    assert_eq!(frames.name(), "frames");
    assert_eq!(frames.size(), 8);
    assert_eq!(frames.max(), 32);

    let sessions = &pools["sessions"];
    assert_eq!(sessions.size(), 0);
    assert_eq!(sessions.max(), 4);
}

#[test]
fn invalid_config_refuses_to_build() {
    let cfg = RuntimeConfig {
        tick_interval_ms: 50,
        pools: [(
            "broken".to_string(),
            PoolSettings {
                prealloc: 100,
                max_idle: 10,
            },
        )]
        .into_iter()
        .collect(),
    };

    let err = build_pools::<Frame, _>(&cfg, |_name, _settings| {
        Ok(Box::new(Frame::default) as Box<dyn Fn() -> Frame + Send + Sync>)
    })
    .expect_err("prealloc above ceiling must be rejected");
    assert!(err.to_string().contains("broken"), "{err}");
}

#[test]
fn factory_errors_propagate() {
    use tickbase::CoreError;

    let cfg = sample_config();
    let err = build_pools::<Frame, _>(&cfg, |name, _settings| {
        Err(CoreError::UnknownPool(name.to_string()))
    })
    .expect_err("factory failure must abort the build");
    assert!(matches!(err, CoreError::UnknownPool(_)));
}

#[test]
fn config_round_trips_through_json() {
    let cfg = sample_config();
    let json = serde_json::to_string(&cfg).expect("config serializes");
    let back = RuntimeConfig::from_json_str(&json).expect("round trip parses");
    assert_eq!(back.tick_interval_ms, cfg.tick_interval_ms);
    assert_eq!(back.pools.len(), cfg.pools.len());
    assert_eq!(back.pools["frames"].prealloc, 8);
}
