//! Custom serialization: persist a set of tags as a comma-separated list
//! instead of JSON.

use std::collections::BTreeSet;

use keepsake::{
    local_state_with, MemoryStorage, Options, Serializer, SerializerError, StorageArea,
    StorageKind, StorageRuntime,
};

struct CommaList;

impl Serializer<BTreeSet<String>> for CommaList {
    fn stringify(&self, value: &BTreeSet<String>) -> Result<String, SerializerError> {
        Ok(value.iter().cloned().collect::<Vec<_>>().join(","))
    }

    fn parse(&self, text: &str) -> Result<BTreeSet<String>, SerializerError> {
        Ok(text
            .split(',')
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect())
    }
}

fn main() {
    let storage = MemoryStorage::new();

    StorageRuntime::scope(storage.clone(), || {
        let tags = local_state_with("tags", BTreeSet::new(), Options::with_serializer(CommaList));

        tags.update(|mut set| {
            set.insert("rust".to_string());
            set
        });
        tags.update(|mut set| {
            set.insert("storage".to_string());
            set
        });

        println!(
            "stored form: {:?}",
            storage.area(StorageKind::Local).get_item("tags").unwrap()
        );
        println!("in memory: {:?}", tags.get());
    });
}
