//! Work out the Kolab type of an existing entry from its object classes, the
//! administrative groups it belongs to, and where it sits in the tree.

use crate::prelude::*;

const OC_KOLAB_INET_ORG_PERSON_FOLDED: &str = "kolabinetorgperson";
const OC_KOLAB_GROUP_OF_NAMES_FOLDED: &str = "kolabgroupofnames";
const OC_KOLAB_SHARED_FOLDER_FOLDED: &str = "kolabsharedfolder";

/// Administrative groups, checked in order. The first one the entry is a member of wins.
const ADMIN_GROUPS: [(&str, ObjectType); 3] = [
    (GROUP_ADMIN, ObjectType::Administrator),
    (GROUP_MAINTAINER, ObjectType::Maintainer),
    (GROUP_DOMAIN_MAINTAINER, ObjectType::DomainMaintainer),
];

#[instrument(level = "debug", skip(session))]
pub fn determine_type<B: Backend>(
    session: &mut DirectorySession<B>,
    dn: &str,
) -> Result<ObjectType, OperationError> {
    let classes = session.get_object_classes(dn)?;
    let has = |c: &str| classes.iter().any(|oc| oc == c);

    if !has(OC_KOLAB_INET_ORG_PERSON_FOLDED) {
        return if has(OC_KOLAB_GROUP_OF_NAMES_FOLDED) {
            Ok(ObjectType::Group)
        } else if has(OC_KOLAB_SHARED_FOLDER_FOLDED) {
            Ok(ObjectType::SharedFolder)
        } else {
            request_warn!(%dn, ?classes, "unknown kolab object type");
            Err(OperationError::UnknownObjectType(dn.to_string()))
        };
    }

    let groups = session.get_groups(dn)?;
    let base = session.get_base_uid().to_string();
    for (group, otype) in ADMIN_GROUPS {
        let group_dn = format!("{},{}", group, base);
        if groups.iter().any(|g| g.eq_ignore_ascii_case(&group_dn)) {
            request_trace!(%dn, %otype, "type from group membership");
            return Ok(otype);
        }
    }

    if dn.to_lowercase().contains(BRANCH_EXTERNAL) {
        Ok(ObjectType::Address)
    } else {
        Ok(ObjectType::User)
    }
}
