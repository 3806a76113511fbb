//! The directory session. This owns a [`Backend`] and the bind state, and builds every
//! lookup the Kolab tree needs out of criteria: finding users by id, mail or alias,
//! resolving groups and their members, and expanding the addresses of a user.
//!
//! Every primitive makes sure the session is bound first, using the configured
//! credentials. If the backend reports that the bind is no longer valid, the session
//! falls back to unbound and returns the error. It does not retry.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::be::{MemoryBackend, MemoryStore};
use crate::config::DirectoryConfig;
use crate::filter::FilterCompiler;
use crate::object::DomainObject;
use crate::prelude::*;
use crate::resolver;
use crate::schema::ServerUidInfo;

/// How many matches a lookup may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultArity {
    /// The first match, if any.
    #[default]
    Single,
    /// At most one match. More than one is an error.
    Strict,
    /// Every match.
    Many,
}

impl ResultArity {
    /// Reduce a result set. Under `Single` and `Strict` at most one element remains.
    pub fn reduce<T>(self, mut results: Vec<T>) -> Result<Vec<T>, OperationError> {
        match self {
            ResultArity::Many => Ok(results),
            ResultArity::Strict if results.len() > 1 => {
                request_warn!(count = results.len(), "ambiguous result for strict lookup");
                Err(OperationError::AmbiguousResult(results.len()))
            }
            ResultArity::Single | ResultArity::Strict => {
                results.truncate(1);
                Ok(results)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindState {
    Unbound,
    Bound { dn: String },
}

#[derive(Debug, Clone, Default)]
pub struct ListParams {
    /// Where to search. Defaults to the session base.
    pub base_dn: Option<String>,
    /// Overrides the sort attribute of the type.
    pub sort: Option<String>,
    /// Attributes to load. Empty loads everything.
    pub attributes: Vec<String>,
}

pub struct DirectorySession<B: Backend> {
    backend: B,
    config: DirectoryConfig,
    compiler: FilterCompiler,
    state: BindState,
}

impl DirectorySession<MemoryBackend> {
    /// A session over an in memory store.
    pub fn memory(
        store: Arc<MemoryStore>,
        config: DirectoryConfig,
    ) -> Result<Self, OperationError> {
        let backend = MemoryBackend::new(store)
            .set_no_anonymous_bind(config.no_anonymous_bind)
            .set_charset(config.get_charset()?);
        Self::new(backend, config)
    }
}

impl<B: Backend> DirectorySession<B> {
    pub fn new(backend: B, config: DirectoryConfig) -> Result<Self, OperationError> {
        let compiler = config.compiler()?;
        admin_debug!(basedn = %config.basedn, filter = ?compiler.base_filter(), "directory session created");
        Ok(DirectorySession {
            backend,
            config,
            compiler,
            state: BindState::Unbound,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    pub fn compiler(&self) -> &FilterCompiler {
        &self.compiler
    }

    pub fn bind_state(&self) -> &BindState {
        &self.state
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.state, BindState::Bound { .. })
    }

    pub fn get_base_uid(&self) -> &str {
        &self.config.basedn
    }

    pub fn compile(&self, crit: &Criteria) -> String {
        self.compiler.compile(crit)
    }

    pub fn bind(&mut self, dn: &str, pw: &str) -> Result<(), OperationError> {
        match self.backend.bind(dn, pw) {
            Ok(()) => {
                security_info!(%dn, "directory bind");
                self.state = BindState::Bound { dn: dn.to_string() };
                Ok(())
            }
            Err(e) => {
                security_error!(?e, %dn, "directory bind failed");
                self.state = BindState::Unbound;
                Err(e)
            }
        }
    }

    pub fn unbind(&mut self) {
        self.backend.unbind();
        self.state = BindState::Unbound;
    }

    fn ensure_bound(&mut self) -> Result<(), OperationError> {
        if self.is_bound() {
            return Ok(());
        }
        let (dn, pw) = (self.config.uid.clone(), self.config.pass.clone());
        self.bind(&dn, &pw)
    }

    /// Run a backend operation under a bind, dropping the bind if the backend rejects it.
    fn with_bind<T, F>(&mut self, f: F) -> Result<T, OperationError>
    where
        F: FnOnce(&mut B) -> Result<T, OperationError>,
    {
        self.ensure_bound()?;
        let res = f(&mut self.backend);
        if let Err(e) = &res {
            if e.is_auth_failure() {
                security_info!(?e, "directory bind lost");
                self.unbind();
            }
        }
        res
    }

    pub fn read(&mut self, dn: &str, attrs: &[String]) -> Result<Entry, OperationError> {
        self.with_bind(|be| be.read(dn, attrs))
    }

    /// Search with a raw filter. Without a base, the session base is used.
    #[instrument(level = "debug", skip_all)]
    pub fn search(
        &mut self,
        filter: &str,
        params: &SearchParams,
        base: Option<&str>,
    ) -> Result<Vec<Entry>, OperationError> {
        let base = base.unwrap_or(self.config.basedn.as_str()).to_string();
        request_trace!(%filter, %base, "directory search");
        self.with_bind(|be| be.search(filter, params, Some(&base)))
    }

    pub fn search_criteria(
        &mut self,
        crit: &Criteria,
        params: &SearchParams,
        base: Option<&str>,
    ) -> Result<Vec<Entry>, OperationError> {
        let filter = self.compile(crit);
        self.search(&filter, params, base)
    }

    pub fn save(&mut self, dn: &str, attrs: Eattrs) -> Result<(), OperationError> {
        self.with_bind(|be| be.save(dn, attrs))
    }

    pub fn delete(&mut self, dn: &str) -> Result<(), OperationError> {
        self.with_bind(|be| be.delete(dn))
    }

    fn dns_for_criteria(
        &mut self,
        crit: &Criteria,
        arity: ResultArity,
    ) -> Result<Vec<String>, OperationError> {
        let params = SearchParams::with_attributes(&[ATTR_DN]);
        let found = self.search_criteria(crit, &params, None)?;
        arity.reduce(found.into_iter().map(|e| e.get_dn().to_string()).collect())
    }

    /// Dns of users matching `crit`.
    pub fn uid_for_search(
        &mut self,
        crit: Criteria,
        arity: ResultArity,
    ) -> Result<Vec<String>, OperationError> {
        let crit = crit.restrict_to_class(OC_KOLAB_INET_ORG_PERSON);
        self.dns_for_criteria(&crit, arity)
    }

    /// Dns of groups matching `crit`.
    pub fn gid_for_search(
        &mut self,
        crit: Criteria,
        arity: ResultArity,
    ) -> Result<Vec<String>, OperationError> {
        let crit = crit.restrict_to_class(OC_KOLAB_GROUP_OF_NAMES);
        self.dns_for_criteria(&crit, arity)
    }

    /// Entries matching `crit`, reduced to `attrs`.
    pub fn attrs_for_search(
        &mut self,
        crit: &Criteria,
        attrs: &[&str],
        arity: ResultArity,
    ) -> Result<Vec<Entry>, OperationError> {
        let params = SearchParams::with_attributes(attrs);
        let found = self.search_criteria(crit, &params, None)?;
        arity.reduce(found)
    }

    pub fn uid_for_id(
        &mut self,
        id: &str,
        arity: ResultArity,
    ) -> Result<Vec<String>, OperationError> {
        self.uid_for_search(c_and(vec![c_eq(ATTR_UID, id)]), arity)
    }

    pub fn uid_for_mail(
        &mut self,
        mail: &str,
        arity: ResultArity,
    ) -> Result<Vec<String>, OperationError> {
        self.uid_for_search(c_and(vec![c_eq(ATTR_MAIL, mail)]), arity)
    }

    pub fn uid_for_alias(
        &mut self,
        mail: &str,
        arity: ResultArity,
    ) -> Result<Vec<String>, OperationError> {
        self.uid_for_search(c_and(vec![c_eq(ATTR_ALIAS, mail)]), arity)
    }

    pub fn uid_for_id_or_mail(
        &mut self,
        id: &str,
        arity: ResultArity,
    ) -> Result<Vec<String>, OperationError> {
        self.uid_for_search(c_or(vec![c_eq(ATTR_UID, id), c_eq(ATTR_MAIL, id)]), arity)
    }

    pub fn uid_for_mail_or_alias(
        &mut self,
        mail: &str,
        arity: ResultArity,
    ) -> Result<Vec<String>, OperationError> {
        self.uid_for_search(c_or(vec![c_eq(ATTR_ALIAS, mail), c_eq(ATTR_MAIL, mail)]), arity)
    }

    pub fn uid_for_id_or_mail_or_alias(
        &mut self,
        id: &str,
        arity: ResultArity,
    ) -> Result<Vec<String>, OperationError> {
        let crit = c_or(vec![
            c_eq(ATTR_ALIAS, id),
            c_eq(ATTR_MAIL, id),
            c_eq(ATTR_UID, id),
        ]);
        self.uid_for_search(crit, arity)
    }

    /// The dn of the first user with this id or mail.
    pub fn first_uid_for_id_or_mail(&mut self, id: &str) -> Result<Option<String>, OperationError> {
        self.uid_for_id_or_mail(id, ResultArity::Single)
            .map(|dns| dns.into_iter().next())
    }

    fn user_by_id_or_mail(id: &str) -> Criteria {
        c_or(vec![c_eq(ATTR_UID, id), c_eq(ATTR_MAIL, id)])
            .restrict_to_class(OC_KOLAB_INET_ORG_PERSON)
    }

    /// The primary mail address of the one user with this id or mail.
    pub fn mail_for_id_or_mail(&mut self, id: &str) -> Result<Option<String>, OperationError> {
        let crit = Self::user_by_id_or_mail(id);
        let found = self.attrs_for_search(&crit, &[ATTR_MAIL], ResultArity::Strict)?;
        Ok(found
            .first()
            .and_then(|e| e.get_ava_single(ATTR_MAIL))
            .map(str::to_string))
    }

    /// Every address a user receives mail for: their mail and aliases, plus those of
    /// every user that delegates to them. All addresses are lower cased.
    #[instrument(level = "debug", skip_all)]
    pub fn addrs_for_id_or_mail(&mut self, id: &str) -> Result<Vec<String>, OperationError> {
        let crit = Self::user_by_id_or_mail(id);
        let found = self.attrs_for_search(&crit, &[ATTR_MAIL, ATTR_ALIAS], ResultArity::Strict)?;
        let Some(user) = found.into_iter().next() else {
            return Ok(Vec::new());
        };

        let addrs_of = |e: &Entry| {
            [ATTR_MAIL, ATTR_ALIAS]
                .iter()
                .flat_map(|a| e.get_ava(a).unwrap_or_default().to_vec())
                .collect::<Vec<_>>()
        };

        let mut addrs = addrs_of(&user);
        if let Some(primary) = user.get_ava_single(ATTR_MAIL) {
            let crit = c_and(vec![
                c_eq(ATTR_OBJECTCLASS, OC_KOLAB_INET_ORG_PERSON),
                c_eq(ATTR_KOLAB_DELEGATE, primary),
            ]);
            let delegates =
                self.attrs_for_search(&crit, &[ATTR_MAIL, ATTR_ALIAS], ResultArity::Many)?;
            addrs.extend(delegates.iter().flat_map(addrs_of));
        }

        Ok(addrs.into_iter().map(|a| a.to_lowercase()).collect())
    }

    pub fn gid_for_mail(
        &mut self,
        mail: &str,
        arity: ResultArity,
    ) -> Result<Vec<String>, OperationError> {
        self.gid_for_search(c_and(vec![c_eq(ATTR_MAIL, mail)]), arity)
    }

    /// Is `uid` a member of the group with address `mail`.
    pub fn member_of_group_address(&mut self, uid: &str, mail: &str) -> Result<bool, OperationError> {
        let crit = c_and(vec![c_eq(ATTR_MAIL, mail), c_eq(ATTR_MEMBER, uid)]);
        self.gid_for_search(crit, ResultArity::Single)
            .map(|dns| !dns.is_empty())
    }

    /// Dns of every group `uid` is a member of.
    pub fn get_groups(&mut self, uid: &str) -> Result<Vec<String>, OperationError> {
        self.gid_for_search(c_and(vec![c_eq(ATTR_MEMBER, uid)]), ResultArity::Many)
    }

    /// The object classes of `dn`, lower cased.
    pub fn get_object_classes(&mut self, dn: &str) -> Result<Vec<String>, OperationError> {
        let e = self.read(dn, &[ATTR_OBJECTCLASS.to_string()])?;
        match e.get_ava(ATTR_OBJECTCLASS) {
            Some(ocs) if !ocs.is_empty() => Ok(ocs.iter().map(|oc| oc.to_lowercase()).collect()),
            _ => Err(OperationError::NoObjectClasses(dn.to_string())),
        }
    }

    pub fn determine_type(&mut self, dn: &str) -> Result<ObjectType, OperationError> {
        resolver::determine_type(self, dn)
    }

    pub fn generate_server_uid(
        &self,
        otype: ObjectType,
        id: &str,
        info: &ServerUidInfo,
    ) -> Result<String, OperationError> {
        otype
            .descriptor()?
            .generate_server_uid(id, info, &self.config.basedn)
    }

    /// Load the object at `dn`. Without a type, the type is worked out from the entry.
    pub fn fetch(
        &mut self,
        dn: &str,
        otype: Option<ObjectType>,
    ) -> Result<DomainObject, OperationError> {
        let otype = match otype {
            Some(t) => t,
            None => self.determine_type(dn)?,
        };
        let entry = self.read(dn, &[])?;
        Ok(DomainObject::from_entry(otype, entry))
    }

    /// A new object of `otype`. Nothing is written until it is saved.
    pub fn create(&self, otype: ObjectType, attrs: Eattrs) -> Result<DomainObject, OperationError> {
        // Refuse types we know nothing about before anything is built.
        otype.descriptor()?;
        Ok(DomainObject::new(otype, attrs))
    }

    /// Every object of `otype` below the base, sorted by the sort attribute. Entries that
    /// are members of the type's required group are left out.
    #[instrument(level = "debug", skip_all)]
    pub fn list_objects(
        &mut self,
        otype: ObjectType,
        params: &ListParams,
    ) -> Result<Vec<(String, DomainObject)>, OperationError> {
        let descriptor = otype.descriptor()?;
        let base = params
            .base_dn
            .clone()
            .unwrap_or_else(|| self.config.basedn.clone());

        let search_params = SearchParams {
            attributes: params.attributes.clone(),
            scope: SearchScope::Sub,
        };
        let mut found = self.search_criteria(&descriptor.filter, &search_params, Some(&base))?;

        if let Some(sort) = params.sort.as_deref().or(descriptor.sort_by) {
            found.sort_by(|a, b| sort_key_cmp(a, b, sort));
        }

        let excluded = match descriptor.required_group_dn(&self.config.basedn) {
            Some(group_dn) => self.group_members(&group_dn)?,
            None => Vec::new(),
        };

        let objects: Vec<_> = found
            .into_iter()
            .filter(|e| {
                !excluded
                    .iter()
                    .any(|m| m.eq_ignore_ascii_case(e.get_dn()))
            })
            .map(|e| (e.get_dn().to_string(), DomainObject::from_entry(otype, e)))
            .collect();

        request_info!(otype = %otype, count = objects.len(), "listed objects");
        Ok(objects)
    }

    /// Members of a group. A group that doesn't exist has no members.
    fn group_members(&mut self, group_dn: &str) -> Result<Vec<String>, OperationError> {
        match self.read(group_dn, &[ATTR_MEMBER.to_string()]) {
            Ok(group) => Ok(group.get_ava(ATTR_MEMBER).unwrap_or_default().to_vec()),
            Err(OperationError::NoSuchObject(_)) => {
                request_trace!(%group_dn, "required group does not exist");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

/// Case insensitive comparison of the first values of `attr`. Missing values sort first.
fn sort_key_cmp(a: &Entry, b: &Entry, attr: &str) -> Ordering {
    let key = |e: &Entry| e.get_ava_single(attr).unwrap_or("").to_lowercase();
    key(a).cmp(&key(b))
}
