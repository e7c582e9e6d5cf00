//! Basic persisted counter: load, subscribe, mutate, reset.

use keepsake::{local_state, MemoryStorage, StorageArea, StorageKind, StorageRuntime};

fn main() {
    let storage = MemoryStorage::new();

    StorageRuntime::scope(storage.clone(), || {
        let counter = local_state("counter", 0);

        let sub = counter.subscribe(|n| println!("counter is now {n}"));

        counter.set(5);
        counter.update(|n| n + 1);
        counter.update(|n| n * 2);

        println!(
            "persisted as: {:?}",
            storage.area(StorageKind::Local).get_item("counter").unwrap()
        );

        counter.reset();
        println!("after reset: {}", counter.get());

        sub.unsubscribe();
    });
}
