//! Startup-time registry of extension kinds (snapshot types, simulated host
//! types). Ids are handed out in registration order, so two processes that
//! register the same kinds in the same order agree on the wire.

use std::any::{TypeId, type_name};
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::codec::{ByteReader, ByteWriter, CodecError, Decode, Encode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KindId(pub u16);

impl Encode for KindId {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_u16(self.0);
    }
}

impl Decode for KindId {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        reader.read_u16().map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("kind name {0:?} registered twice")]
    DuplicateName(&'static str),
    #[error("type {0} registered twice")]
    DuplicateType(&'static str),
    #[error("kind id space exhausted")]
    Full,
}

#[derive(Debug, Clone)]
pub struct KindEntry {
    pub id: KindId,
    pub name: &'static str,
    pub type_name: &'static str,
    type_id: TypeId,
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<KindEntry>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: 'static>(mut self, name: &'static str) -> Result<Self, RegistryError> {
        if self.entries.iter().any(|entry| entry.name == name) {
            return Err(RegistryError::DuplicateName(name));
        }
        let type_id = TypeId::of::<T>();
        if self.entries.iter().any(|entry| entry.type_id == type_id) {
            return Err(RegistryError::DuplicateType(type_name::<T>()));
        }
        let id = u16::try_from(self.entries.len()).map_err(|_| RegistryError::Full)?;

        self.entries.push(KindEntry {
            id: KindId(id),
            name,
            type_name: type_name::<T>(),
            type_id,
        });
        Ok(self)
    }

    pub fn build(self) -> Registry {
        let by_type = self
            .entries
            .iter()
            .map(|entry| (entry.type_id, entry.id))
            .collect();
        let by_name = self
            .entries
            .iter()
            .map(|entry| (entry.name, entry.id))
            .collect();
        Registry {
            entries: self.entries,
            by_type,
            by_name,
        }
    }
}

#[derive(Debug)]
pub struct Registry {
    entries: Vec<KindEntry>,
    by_type: HashMap<TypeId, KindId>,
    by_name: HashMap<&'static str, KindId>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn kind_of<T: 'static>(&self) -> Option<KindId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<KindId> {
        self.by_name.get(name).copied()
    }

    pub fn entry(&self, kind: KindId) -> Option<&KindEntry> {
        self.entries.get(kind.0 as usize)
    }

    pub fn name(&self, kind: KindId) -> Option<&'static str> {
        self.entry(kind).map(|entry| entry.name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KindEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
