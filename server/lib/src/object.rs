//! Domain objects are entries seen through the schema of one [`ObjectType`].
//!
//! An object holds the attributes it was loaded with as a read only snapshot, plus any
//! pending changes. Derived attributes are computed on first access and cached until
//! the object changes. Once an object has been stored, its locked attributes can no
//! longer be set.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::prelude::*;
use crate::schema::ServerUidInfo;

#[derive(Debug)]
pub struct DomainObject {
    otype: ObjectType,
    dn: Option<String>,
    snapshot: Eattrs,
    changes: Eattrs,
    derived_cache: RefCell<BTreeMap<AttrString, Option<Vec<String>>>>,
    stored: bool,
}

impl DomainObject {
    /// A new object that has not been saved yet.
    pub fn new(otype: ObjectType, attrs: Eattrs) -> Self {
        let changes = attrs
            .into_iter()
            .map(|(k, v)| (fold_attr(&k), v))
            .collect();
        DomainObject {
            otype,
            dn: None,
            snapshot: Eattrs::new(),
            changes,
            derived_cache: RefCell::new(BTreeMap::new()),
            stored: false,
        }
    }

    /// An object loaded from the directory.
    pub fn from_entry(otype: ObjectType, entry: Entry) -> Self {
        let dn = entry.get_dn().to_string();
        DomainObject {
            otype,
            dn: Some(dn),
            snapshot: entry.into_attrs(),
            changes: Eattrs::new(),
            derived_cache: RefCell::new(BTreeMap::new()),
            stored: true,
        }
    }

    pub fn object_type(&self) -> ObjectType {
        self.otype
    }

    pub fn dn(&self) -> Option<&str> {
        self.dn.as_deref()
    }

    pub fn is_stored(&self) -> bool {
        self.stored
    }

    /// Stored and pending attributes, pending changes winning.
    fn merged(&self) -> Eattrs {
        let mut attrs = self.snapshot.clone();
        attrs.extend(self.changes.iter().map(|(k, v)| (k.clone(), v.clone())));
        attrs
    }

    fn derive(&self, attr: &AttrString) -> Result<Option<Vec<String>>, OperationError> {
        if let Some(cached) = self.derived_cache.borrow().get(attr) {
            return Ok(cached.clone());
        }

        let schema = self.otype.schema()?;
        let value = match (schema.derived.get(attr), self.dn.as_deref()) {
            (Some(rule), dn) => rule.derive(dn.unwrap_or(""), &self.merged()),
            (None, _) => None,
        };
        self.derived_cache
            .borrow_mut()
            .insert(attr.clone(), value.clone());
        Ok(value)
    }

    /// Look up an attribute: stored or pending values first, then derived values, then
    /// the type's default.
    pub fn get(&self, attr: &str) -> Result<Option<Vec<String>>, OperationError> {
        let attr = fold_attr(attr);
        if let Some(vs) = self.changes.get(&attr).or_else(|| self.snapshot.get(&attr)) {
            return Ok(Some(vs.clone()));
        }
        if let Some(vs) = self.derive(&attr)? {
            return Ok(Some(vs));
        }
        Ok(self.otype.schema()?.defaults.get(&attr).cloned())
    }

    pub fn get_single(&self, attr: &str) -> Result<Option<String>, OperationError> {
        self.get(attr)
            .map(|vs| vs.and_then(|vs| vs.into_iter().next()))
    }

    pub fn set(&mut self, attr: &str, values: Vec<String>) -> Result<(), OperationError> {
        let attr = fold_attr(attr);
        if self.stored && self.otype.schema()?.locked.contains(&attr) {
            request_warn!(%attr, dn = ?self.dn, "attempt to change a locked attribute");
            return Err(OperationError::LockedAttribute(attr.to_string()));
        }
        self.changes.insert(attr, values);
        self.derived_cache.borrow_mut().clear();
        Ok(())
    }

    /// The named attributes with derived values filled in. An empty list gives every
    /// stored attribute and every derived attribute of the type.
    pub fn to_attrs(&self, attrs: &[String]) -> Result<Eattrs, OperationError> {
        let names: Vec<AttrString> = if attrs.is_empty() {
            let schema = self.otype.schema()?;
            self.merged()
                .into_keys()
                .chain(schema.derived.keys().cloned())
                .collect()
        } else {
            attrs.iter().map(|a| fold_attr(a)).collect()
        };

        let mut out = Eattrs::new();
        for name in names {
            if let Some(vs) = self.get(&name)? {
                out.insert(name, vs);
            }
        }
        Ok(out)
    }

    /// The attributes that will be written: derived attributes and placement hints are
    /// dropped, defaults and the type's object classes are filled in.
    fn prepare_save(&self) -> Result<Eattrs, OperationError> {
        let descriptor = self.otype.descriptor()?;
        let schema = self.otype.schema()?;

        let mut data = self.merged();
        data.retain(|k, _| !schema.derived.contains_key(k));
        data.remove(&fold_attr(INFO_USER_TYPE));
        data.remove(&fold_attr(INFO_VISIBLE));

        for (attr, default) in schema.defaults.iter() {
            let missing = data.get(attr).map(|vs| vs.is_empty()).unwrap_or(true);
            if missing {
                data.insert(attr.clone(), default.clone());
            }
        }

        let oc_attr = Attribute::ObjectClass.folded();
        let existing = data.remove(&oc_attr).unwrap_or_default();
        let mut classes: Vec<String> = descriptor
            .object_classes
            .iter()
            .map(|c| c.to_string())
            .collect();
        for c in existing {
            if !classes.iter().any(|k| k.eq_ignore_ascii_case(&c)) {
                classes.push(c);
            }
        }
        data.insert(oc_attr, classes);
        Ok(data)
    }

    /// Write the object. A new object is placed in the tree according to its type.
    #[instrument(level = "debug", skip_all)]
    pub fn save<B: Backend>(
        &mut self,
        session: &mut DirectorySession<B>,
    ) -> Result<(), OperationError> {
        let dn = match &self.dn {
            Some(dn) => dn.clone(),
            None => {
                let merged = self.merged();
                let id = self.otype.descriptor()?.generate_id(&merged)?;
                let info = ServerUidInfo::from(&merged);
                session.generate_server_uid(self.otype, &id, &info)?
            }
        };

        let data = self.prepare_save()?;
        session.save(&dn, data.clone())?;
        request_info!(%dn, otype = %self.otype, "object saved");

        self.dn = Some(dn);
        self.snapshot = data;
        self.changes.clear();
        self.derived_cache.borrow_mut().clear();
        self.stored = true;
        Ok(())
    }

    pub fn delete<B: Backend>(
        &self,
        session: &mut DirectorySession<B>,
    ) -> Result<(), OperationError> {
        match &self.dn {
            Some(dn) => session.delete(dn),
            None => Err(OperationError::NoSuchObject(
                "object has not been saved".to_string(),
            )),
        }
    }
}
