//! Integration tests for the synchronization engine against mock process
//! memory: tick behavior, write/mirror semantics, the liveness-triggered
//! detach policy, and name-buffer decoding.

use ojuice_core::{
    AppConfig, CommonKind, FieldKey, MatchKind, MockProcess, MockProcessBuilder, MockProvider,
    NameRange, OffsetTable, PlayerStat, ProcessMemory, Snapshot, Status, Strides, SyncEngine,
};

const BASE: u64 = 0x1000;

/// Table exercising every resolution source:
/// - session base pointer at base+0x10 -> 0x2000
/// - chain root pointer at base+0x20 -> 0x3000
/// - `dice` is a direct field (0x2040) mirrored at direct offset 0x44 (0x2044)
/// - `round_count` is module-relative (base+0x80)
/// - hp chain [0x20, 0x8] with stride 0x100, star base `player2_star`
/// - `common_orange` has a generic double-write chain
fn sample_table() -> OffsetTable {
    let mut table = OffsetTable {
        base_offset: 0x10,
        ..OffsetTable::default()
    };
    table.fields.insert("dice".into(), 0x40);
    table.module_fields.insert("round_count".into(), 0x80);
    table
        .pointer_chains
        .insert("player_hp".into(), vec![0x20, 0x8]);
    table
        .pointer_chains
        .insert("player_win".into(), vec![0x20, 0x30, 0xC]);
    table
        .pointer_chains
        .insert("player_star".into(), vec![0x20, 0xC0]);
    table
        .pointer_chains
        .insert("player2_star".into(), vec![0x20, 0x10]);
    table
        .pointer_chains
        .insert("common_orange".into(), vec![0x60]);
    table
        .double_write_fields
        .insert("dice".into(), vec![0x44]);
    table
        .double_write
        .insert("common_orange".into(), vec![0x64]);
    table
        .double_write
        .insert("player_star".into(), vec![0x20, 0x2C0]);
    table
        .double_write
        .insert("player2_star".into(), vec![0x20, 0x210]);
    table.strides = Strides {
        hp: 0x100,
        win: 0x100,
        star: 0x40,
    };
    table
}

fn sample_memory() -> MockProcess {
    MockProcessBuilder::new()
        .base(BASE)
        .with_size(0x4000)
        .write_ptr(0x10, 0x2000) // session base pointer
        .write_ptr(0x20, 0x3000) // chain root
        .write_ptr(0x60, 0x2800) // common_orange root
        .write_ptr(0x64, 0x2900) // common_orange mirror root
        .write_ptr(0x2030, 0x3800) // middle hop of player_win
        .write_i32(0x1040, 7) // dice primary (0x2040)
        .write_i32(0x80, 12) // round_count (module-relative)
        .write_i32(0x2008, 5) // player1 hp (0x3008)
        .write_utf8(0x2400, "Ali") // player1 name buffer (0x3400)
        .build()
}

fn sample_config() -> AppConfig {
    AppConfig {
        process_name: "100orange.exe".into(),
        module_name: "100orange.exe".into(),
        poll_interval_ms: 300,
        table: sample_table(),
    }
}

fn engine_with(memory: &MockProcess) -> SyncEngine<MockProvider> {
    SyncEngine::new(MockProvider::new(memory.clone()), &sample_config())
}

fn field_value(snapshot: &Snapshot, key: FieldKey) -> Option<i32> {
    snapshot
        .fields
        .iter()
        .find(|reading| reading.key == key)
        .expect("key missing from snapshot")
        .value
}

#[test]
fn test_tick_attaches_and_publishes_values() {
    let memory = sample_memory();
    let mut engine = engine_with(&memory);
    assert_eq!(engine.status(), Status::Detached);

    let snapshot = engine.refresh_tick();
    assert_eq!(snapshot.status, Status::Detected);
    assert!(engine.attached());
    assert_eq!(field_value(&snapshot, FieldKey::Match(MatchKind::Dice)), Some(7));
    assert_eq!(
        field_value(&snapshot, FieldKey::Match(MatchKind::RoundCount)),
        Some(12)
    );
    assert_eq!(
        field_value(
            &snapshot,
            FieldKey::Player {
                index: 1,
                stat: PlayerStat::Hp
            }
        ),
        Some(5)
    );
}

#[test]
fn test_tick_publishes_round_counter() {
    let memory = sample_memory();
    let mut engine = engine_with(&memory);

    let snapshot = engine.refresh_tick();
    assert_eq!(snapshot.round, Some(12));
    assert_eq!(engine.round(), Some(12));
}

#[test]
fn test_tick_reports_configured_flags() {
    let memory = sample_memory();
    let mut engine = engine_with(&memory);

    let snapshot = engine.refresh_tick();
    let dice = snapshot
        .fields
        .iter()
        .find(|r| r.key == FieldKey::Match(MatchKind::Dice))
        .unwrap();
    assert!(dice.configured);

    let unconfigured = snapshot
        .fields
        .iter()
        .find(|r| r.key == FieldKey::Match(MatchKind::AttackDiceLeft))
        .unwrap();
    assert!(!unconfigured.configured);
}

#[test]
fn test_silent_attach_failure_publishes_waiting() {
    let mut engine = SyncEngine::new(MockProvider::absent(), &sample_config());

    let snapshot = engine.refresh_tick();
    assert_eq!(snapshot.status, Status::Waiting);
    assert!(snapshot.fields.is_empty());
    assert!(!engine.attached());
}

#[test]
fn test_explicit_attach_surfaces_error() {
    let mut engine = SyncEngine::new(MockProvider::absent(), &sample_config());
    assert!(engine.attach().is_err());
    assert_eq!(engine.status(), Status::Waiting);
}

#[test]
fn test_write_then_read_round_trip() {
    let memory = sample_memory();
    let mut engine = engine_with(&memory);
    engine.attach().unwrap();

    let key = FieldKey::Player {
        index: 1,
        stat: PlayerStat::Hp,
    };
    engine.write_field(&key, 42).unwrap();
    let snapshot = engine.refresh_tick();
    assert_eq!(field_value(&snapshot, key), Some(42));
}

#[test]
fn test_double_write_fields_mirror() {
    let memory = sample_memory();
    let mut engine = engine_with(&memory);
    engine.attach().unwrap();

    engine
        .write_field(&FieldKey::Match(MatchKind::Dice), 99)
        .unwrap();
    // Primary at deref(base+0x10)+0x40, mirror at deref(base+0x10)+0x44
    assert_eq!(memory.read_i32(0x2040).unwrap(), 99);
    assert_eq!(memory.read_i32(0x2044).unwrap(), 99);
}

#[test]
fn test_mirror_skipped_when_same_address() {
    let mut table = sample_table();
    // Mirror offset identical to the primary field offset
    table.double_write_fields.insert("dice".into(), vec![0x40]);
    let config = AppConfig {
        table,
        ..sample_config()
    };
    let memory = sample_memory();
    let mut engine = SyncEngine::new(MockProvider::new(memory.clone()), &config);
    engine.attach().unwrap();

    let before = memory.write_count();
    engine
        .write_field(&FieldKey::Match(MatchKind::Dice), 55)
        .unwrap();
    assert_eq!(memory.write_count() - before, 1);
    assert_eq!(memory.read_i32(0x2040).unwrap(), 55);
}

#[test]
fn test_generic_double_write_chain_mirror() {
    let memory = sample_memory();
    let mut engine = engine_with(&memory);
    engine.attach().unwrap();

    engine
        .write_field(&FieldKey::Common(CommonKind::Orange), 31)
        .unwrap();
    // Primary: deref(base+0x60) = 0x2800; mirror: deref(base+0x64) = 0x2900
    assert_eq!(memory.read_i32(0x2800).unwrap(), 31);
    assert_eq!(memory.read_i32(0x2900).unwrap(), 31);
}

#[test]
fn test_star_mirror_uses_derived_secondary_chain() {
    let memory = sample_memory();
    let mut engine = engine_with(&memory);
    engine.attach().unwrap();

    engine
        .write_field(
            &FieldKey::Player {
                index: 3,
                stat: PlayerStat::Star,
            },
            8,
        )
        .unwrap();
    // Primary: player2_star chain +0x40 = 0x3050; mirror: 0x3210+0x40 = 0x3250
    assert_eq!(memory.read_i32(0x3050).unwrap(), 8);
    assert_eq!(memory.read_i32(0x3250).unwrap(), 8);
}

#[test]
fn test_player1_star_mirror_survives_aliasing() {
    let memory = sample_memory();
    let mut engine = engine_with(&memory);
    engine.attach().unwrap();

    engine
        .write_field(
            &FieldKey::Player {
                index: 1,
                stat: PlayerStat::Star,
            },
            64,
        )
        .unwrap();
    // Primary through the player_star alias chain, mirror through the
    // player_star double-write chain
    assert_eq!(memory.read_i32(0x30C0).unwrap(), 64);
    assert_eq!(memory.read_i32(0x32C0).unwrap(), 64);
}

#[test]
fn test_write_unconfigured_key_is_rejected() {
    let memory = sample_memory();
    let mut engine = engine_with(&memory);
    engine.attach().unwrap();

    let result = engine.write_field(&FieldKey::Match(MatchKind::AttackDiceRight), 1);
    assert!(matches!(result, Err(ojuice_core::Error::NotConfigured(_))));
}

#[test]
fn test_write_while_detached_is_rejected() {
    let memory = sample_memory();
    let engine = engine_with(&memory);

    let result = engine.write_field(&FieldKey::Match(MatchKind::Dice), 1);
    assert!(matches!(result, Err(ojuice_core::Error::NotAttached)));
}

#[test]
fn test_locked_field_is_rewritten_each_tick() {
    let memory = sample_memory();
    let mut engine = engine_with(&memory);
    engine.attach().unwrap();

    let key = FieldKey::Player {
        index: 1,
        stat: PlayerStat::Hp,
    };
    engine.set_lock(key, 200).unwrap();

    let snapshot = engine.refresh_tick();
    assert_eq!(field_value(&snapshot, key), Some(200));
    assert_eq!(memory.read_i32(0x3008).unwrap(), 200);

    // Simulate the game lowering the value; the next tick restores it
    memory.write_i32(0x3008, 1).unwrap();
    let snapshot = engine.refresh_tick();
    assert_eq!(field_value(&snapshot, key), Some(200));

    engine.clear_lock(&key);
    memory.write_i32(0x3008, 1).unwrap();
    let snapshot = engine.refresh_tick();
    assert_eq!(field_value(&snapshot, key), Some(1));
}

#[test]
fn test_lock_on_unconfigured_key_is_rejected() {
    let memory = sample_memory();
    let mut engine = engine_with(&memory);
    assert!(
        engine
            .set_lock(FieldKey::Match(MatchKind::AttackDiceLeft), 5)
            .is_err()
    );
}

#[test]
fn test_field_failure_with_live_process_keeps_attachment() {
    let mut table = sample_table();
    // Chain pointing outside the mock buffer makes player hp unreadable
    table
        .pointer_chains
        .insert("player_hp".into(), vec![0x20, 0x9000]);
    let config = AppConfig {
        table,
        ..sample_config()
    };
    let memory = sample_memory();
    let mut engine = SyncEngine::new(MockProvider::new(memory.clone()), &config);

    let snapshot = engine.refresh_tick();
    assert_eq!(snapshot.status, Status::Detected);
    assert!(engine.attached());
    assert_eq!(
        field_value(
            &snapshot,
            FieldKey::Player {
                index: 1,
                stat: PlayerStat::Hp
            }
        ),
        None
    );
    // Other fields still published
    assert_eq!(field_value(&snapshot, FieldKey::Match(MatchKind::Dice)), Some(7));
}

#[test]
fn test_field_failure_with_dead_process_detaches() {
    let mut table = sample_table();
    table
        .pointer_chains
        .insert("player_hp".into(), vec![0x20, 0x9000]);
    let config = AppConfig {
        table,
        ..sample_config()
    };
    let memory = sample_memory();
    let mut engine = SyncEngine::new(MockProvider::new(memory.clone()), &config);
    engine.attach().unwrap();

    memory.set_alive(false);
    let snapshot = engine.refresh_tick();
    assert_eq!(snapshot.status, Status::Waiting);
    assert!(!engine.attached());
}

#[test]
fn test_dead_process_without_field_failure_stays_attached() {
    let memory = sample_memory();
    let mut engine = engine_with(&memory);
    engine.attach().unwrap();

    // Every field still reads fine from the lingering mock buffer, so the
    // liveness probe alone must not force a detach.
    memory.set_alive(false);
    let snapshot = engine.refresh_tick();
    assert_eq!(snapshot.status, Status::Detected);
    assert!(engine.attached());
}

#[test]
fn test_terminate_detaches_and_reports_waiting() {
    let memory = sample_memory();
    let mut engine = engine_with(&memory);
    engine.attach().unwrap();

    engine.terminate().unwrap();
    assert!(!engine.attached());
    assert_eq!(engine.status(), Status::Waiting);
    assert!(!memory.is_alive());
}

#[test]
fn test_name_buffers_decoded_on_tick() {
    let mut table = sample_table();
    table.name_ranges.insert(
        "player_name".into(),
        NameRange {
            chain: vec![0x20],
            start: 0x400,
            end: 0x40B,
        },
    );
    let config = AppConfig {
        table,
        ..sample_config()
    };
    let memory = sample_memory();
    let mut engine = SyncEngine::new(MockProvider::new(memory.clone()), &config);

    let snapshot = engine.refresh_tick();
    assert_eq!(snapshot.names.len(), 4);
    assert_eq!(snapshot.names[0], (1, "Ali".to_string()));
    // Unconfigured seats publish empty names
    assert_eq!(snapshot.names[1], (2, String::new()));
}

#[test]
fn test_shift_jis_name_fallback_on_tick() {
    let mut table = sample_table();
    table.name_ranges.insert(
        "player2_name".into(),
        NameRange {
            chain: vec![0x20],
            start: 0x500,
            end: 0x50F,
        },
    );
    let config = AppConfig {
        table,
        ..sample_config()
    };
    let memory = MockProcessBuilder::new()
        .base(BASE)
        .with_size(0x4000)
        .write_ptr(0x10, 0x2000)
        .write_ptr(0x20, 0x3000)
        .write_ptr(0x60, 0x2800)
        .write_ptr(0x64, 0x2900)
        .write_ptr(0x2030, 0x3800)
        .write_shift_jis(0x2500, "スグリ") // player2 name buffer (0x3500)
        .build();
    let mut engine = SyncEngine::new(MockProvider::new(memory.clone()), &config);

    let snapshot = engine.refresh_tick();
    assert_eq!(snapshot.names[1], (2, "スグリ".to_string()));
}

#[test]
fn test_poll_interval_clamps() {
    let memory = sample_memory();
    let mut engine = engine_with(&memory);

    assert_eq!(engine.set_poll_interval_ms(10), 50);
    assert_eq!(engine.set_poll_interval_ms(60_000), 5000);
    assert_eq!(engine.set_poll_interval_ms(300), 300);
    assert_eq!(engine.poll_interval().as_millis(), 300);
}

#[test]
fn test_reattach_after_detach_on_next_tick() {
    let memory = sample_memory();
    let mut engine = engine_with(&memory);
    engine.attach().unwrap();
    engine.detach();
    assert_eq!(engine.status(), Status::Waiting);

    let snapshot = engine.refresh_tick();
    assert_eq!(snapshot.status, Status::Detected);
    assert!(engine.attached());
}
