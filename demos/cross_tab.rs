//! Cross-tab synchronization: a change made by another execution context is
//! folded into every local subscriber without a redundant write-back.

use keepsake::{local_state, MemoryStorage, StorageRuntime};

fn main() {
    let storage = MemoryStorage::new();

    StorageRuntime::scope(storage.clone(), || {
        let theme = local_state("theme", String::from("light"));

        let sub = theme.subscribe(|t| println!("theme: {t}"));

        // Another tab writes the same key and the browser fires its storage
        // event; external_set simulates both halves.
        storage.external_set("theme", "\"dark\"");

        println!("observed: {}", theme.get());
        sub.unsubscribe();

        // With no subscriber attached, the listener is detached and external
        // changes pass by.
        storage.external_set("theme", "\"solarized\"");
        println!("while detached, still: {}", theme.get());
    });
}
