//! Integration tests for the entity table.

use std::collections::HashSet;

use keel_core::{
    ComponentStore, EcsError, EntityId, EntityTable, GenerationalIds, GrowthPolicy, IdAllocator,
    PoolPolicy, PoolStore, QueryBuffer, RegistryBuilder, SharedTable, TableConfig, TypeIndex,
};

#[derive(Clone, Debug, Default, PartialEq)]
struct A(u32);

#[derive(Clone, Debug, Default, PartialEq)]
struct B(u32);

#[derive(Clone, Debug, Default, PartialEq)]
struct C(u32);

#[derive(Clone, Debug, Default, PartialEq)]
struct Gravity(f32);

#[derive(Clone, Debug, Default, PartialEq)]
struct FrameCount(u64);

struct Types {
    a: TypeIndex,
    b: TypeIndex,
    c: TypeIndex,
}

fn table_with(config: TableConfig) -> (EntityTable, Types) {
    let mut builder = RegistryBuilder::new();
    let a = builder.register::<A>();
    let b = builder.register::<B>();
    let c = builder.register::<C>();
    builder.register_singleton::<Gravity>();
    builder.register_singleton::<FrameCount>();
    let table = EntityTable::with_config(builder.build().unwrap(), config);
    (table, Types { a, b, c })
}

fn table() -> (EntityTable, Types) {
    table_with(TableConfig::default())
}

#[test]
fn test_query_mixed_population() {
    let (mut table, t) = table();
    let e1 = table.create_entity().unwrap();
    let e2 = table.create_entity().unwrap();
    let e3 = table.create_entity().unwrap();

    table.insert(e1, A(1)).unwrap();
    table.insert(e1, B(1)).unwrap();
    table.insert(e2, A(2)).unwrap();
    table.insert(e3, A(3)).unwrap();
    table.insert(e3, B(3)).unwrap();
    table.insert(e3, C(3)).unwrap();

    let matches = table.query(&[t.a, t.b]).unwrap();
    let found: HashSet<EntityId> = matches.entities().iter().copied().collect();
    assert_eq!(found, HashSet::from([e1, e3]));

    for m in matches.iter() {
        let a = table.resolve::<A>(m.slots[0]).unwrap();
        let b = table.resolve::<B>(m.slots[1]).unwrap();
        assert_eq!(a.0, b.0);
        assert!(table.has_component(m.entity, t.a) && table.has_component(m.entity, t.b));
    }
}

#[test]
fn test_query_after_remove_keeps_order() {
    let (mut table, t) = table();
    let ids: Vec<_> = (0..3).map(|_| table.create_entity().unwrap()).collect();
    for &e in &ids {
        table.add_component(e, t.a).unwrap();
    }
    table.remove_component(ids[1], t.a).unwrap();

    let matches = table.query(&[t.a]).unwrap();
    assert_eq!(matches.entities(), &[ids[0], ids[2]]);
}

#[test]
fn test_query_slots_follow_requested_order() {
    let (mut table, t) = table();
    let e = table.create_entity().unwrap();
    table.insert(e, A(10)).unwrap();
    table.insert(e, C(30)).unwrap();

    let mut buffer = QueryBuffer::new();
    table.query_into(&[t.c, t.a], &mut buffer).unwrap();
    let m = buffer.get(0).unwrap();
    assert_eq!(table.resolve::<C>(m.slots[0]), Some(&C(30)));
    assert_eq!(table.resolve::<A>(m.slots[1]), Some(&A(10)));
}

#[test]
fn test_add_remove_isolated() {
    let (mut table, t) = table();
    let e = table.create_entity().unwrap();
    table.insert(e, A(1)).unwrap();
    table.insert(e, C(3)).unwrap();

    table.add_component(e, t.b).unwrap();
    assert!(table.has_component(e, t.b));
    table.remove_component(e, t.b).unwrap();
    assert!(!table.has_component(e, t.b));

    assert_eq!(table.get::<A>(e), Ok(&A(1)));
    assert_eq!(table.get::<C>(e), Ok(&C(3)));
    assert_eq!(table.mask(e).unwrap().count(), 2);
}

#[test]
fn test_precondition_errors() {
    let (mut table, t) = table();
    let e = table.create_entity().unwrap();
    table.add_component(e, t.a).unwrap();

    assert_eq!(
        table.add_component(e, t.a),
        Err(EcsError::ComponentAlreadyPresent {
            entity: e,
            type_index: t.a
        })
    );
    assert_eq!(
        table.remove_component(e, t.b),
        Err(EcsError::ComponentMissing {
            entity: e,
            type_index: t.b
        })
    );

    table.destroy_entity(e).unwrap();
    assert_eq!(table.destroy_entity(e), Err(EcsError::UnknownEntity(e)));
    assert_eq!(table.get_component(e, t.a), Err(EcsError::UnknownEntity(e)));
    assert!(!table.exists(e));
}

#[test]
fn test_destroyed_storage_reused() {
    let (mut table, t) = table();
    let first: Vec<_> = (0..10)
        .map(|_| {
            let e = table.create_entity().unwrap();
            table.add_component(e, t.b).unwrap();
            e
        })
        .collect();
    let size_before = table.stats().components[t.b.get()].size;

    for e in first {
        table.destroy_entity(e).unwrap();
    }
    assert_eq!(table.stats().components[t.b.get()].occupied, 0);

    for _ in 0..10 {
        let e = table.create_entity().unwrap();
        table.add_component(e, t.b).unwrap();
    }
    let stats = table.stats();
    assert_eq!(stats.components[t.b.get()].size, size_before);
    assert_eq!(stats.components[t.b.get()].occupied, 10);
}

#[test]
fn test_reset_clears_everything() {
    let (mut table, t) = table();
    let ids: Vec<_> = (0..5)
        .map(|i| {
            let e = table.create_entity().unwrap();
            table.insert(e, A(i)).unwrap();
            e
        })
        .collect();
    table.add_singleton(Gravity(9.8)).unwrap();
    table.add_singleton(FrameCount(7)).unwrap();

    table.reset();

    assert!(ids.iter().all(|&e| !table.exists(e)));
    assert!(!table.has_singleton::<Gravity>());
    assert!(!table.has_singleton::<FrameCount>());
    assert!(table.is_empty());

    let e = table.create_entity().unwrap();
    table.insert(e, A(42)).unwrap();
    assert_eq!(table.query(&[t.a]).unwrap().entities(), &[e]);

    // Handles from before the reset never alias the new entity
    assert!(!ids.contains(&e));
    for &old in &ids {
        assert!(!table.exists(old));
        assert_eq!(table.get::<A>(old), Err(EcsError::UnknownEntity(old)));
    }

    table.reset();
    table.reset();
    assert!(table.is_empty());
}

#[test]
fn test_singleton_round_trip() {
    let (mut table, _) = table();
    table.add_singleton(FrameCount(0)).unwrap();

    for _ in 0..3 {
        table.singleton_mut::<FrameCount>().unwrap().0 += 1;
    }
    assert_eq!(table.singleton::<FrameCount>(), Ok(&FrameCount(3)));
    assert!(matches!(
        table.add_singleton(FrameCount(9)),
        Err(EcsError::SingletonAlreadyPresent(_))
    ));

    assert_eq!(table.remove_singleton::<FrameCount>(), Ok(FrameCount(3)));
    assert!(matches!(
        table.singleton::<FrameCount>(),
        Err(EcsError::SingletonMissing(_))
    ));
}

#[test]
fn test_config_from_toml() {
    let config = TableConfig::from_toml_str(
        r#"
        [entity_records]
        initial_size = 32

        [components]
        initial_size = 8
        growth = { kind = "linear", step = 8 }
        "#,
    )
    .unwrap();

    let (mut table, t) = table_with(config);
    let stats = table.stats();
    assert_eq!(stats.record_slots, 32);
    assert!(stats.components.iter().all(|p| p.size == 8));

    for _ in 0..9 {
        let e = table.create_entity().unwrap();
        table.add_component(e, t.c).unwrap();
    }
    assert_eq!(table.stats().components[t.c.get()].size, 16);
}

#[test]
fn test_config_load_file() {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = std::env::temp_dir().join(format!("keel_table_{id}.toml"));
    std::fs::write(&path, "[components]\ninitial_size = 4\n").unwrap();

    let config = TableConfig::load(&path).unwrap();
    assert_eq!(config.components.initial_size, 4);
    assert_eq!(config.entity_records.initial_size, 0);

    std::fs::remove_file(&path).ok();
    assert!(TableConfig::load(&path).is_err());
}

#[test]
fn test_zero_growth_fails_loudly() {
    let config = TableConfig {
        entity_records: PoolPolicy::default(),
        components: PoolPolicy::new(1, GrowthPolicy::Fixed { size: 0 }),
    };
    let (mut table, t) = table_with(config);

    let e1 = table.create_entity().unwrap();
    let e2 = table.create_entity().unwrap();
    table.add_component(e1, t.a).unwrap();
    assert!(matches!(
        table.add_component(e2, t.a),
        Err(EcsError::Pool(keel_core::PoolError::PoolMisconfigured { .. }))
    ));
    assert!(!table.has_component(e2, t.a));
}

/// Sequential IDs that are never reused.
#[derive(Default)]
struct SequentialIds {
    next: u32,
    released: Vec<EntityId>,
}

impl IdAllocator for SequentialIds {
    fn acquire(&mut self) -> EntityId {
        let id = EntityId::new(self.next, 0);
        self.next += 1;
        id
    }

    fn release(&mut self, id: EntityId) {
        self.released.push(id);
    }
}

#[test]
fn test_injected_allocator() {
    let mut builder = RegistryBuilder::new();
    let a = builder.register::<A>();
    let registry = builder.build().unwrap();
    let config = TableConfig::default();
    let store = PoolStore::from_registry(&registry, &config.components);
    assert_eq!(store.type_count(), 1);

    let mut table = EntityTable::with_parts(registry, config, SequentialIds::default(), store);
    let e0 = table.create_entity().unwrap();
    table.add_component(e0, a).unwrap();
    table.destroy_entity(e0).unwrap();
    let e1 = table.create_entity().unwrap();

    assert_eq!(e0.index(), 0);
    assert_eq!(e1.index(), 1);
    assert!(!table.has_component(e0, a));
    assert!(!table.has_component(e1, a));
}

#[test]
fn test_shared_table_frames() {
    let (mut table, t) = table();
    table.add_singleton(FrameCount(0)).unwrap();
    for i in 0..16 {
        let e = table.create_entity().unwrap();
        table.insert(e, A(i)).unwrap();
    }
    let shared: SharedTable<GenerationalIds, PoolStore> = SharedTable::new(table);

    let sim = shared.clone();
    let worker = std::thread::spawn(move || {
        let mut buffer = QueryBuffer::new();
        for _ in 0..10 {
            sim.with(|table| {
                table.query_into(&[t.a], &mut buffer).unwrap();
                for m in buffer.iter() {
                    table.resolve_mut::<A>(m.slots[0]).unwrap().0 += 1;
                }
                table.singleton_mut::<FrameCount>().unwrap().0 += 1;
            });
        }
    });
    worker.join().unwrap();

    let table = shared.lock();
    assert_eq!(table.singleton::<FrameCount>(), Ok(&FrameCount(10)));
    let total: u32 = table
        .entities()
        .map(|e| table.get::<A>(e).unwrap().0)
        .sum();
    assert_eq!(total, (0..16).sum::<u32>() + 16 * 10);
}
