use serde::{Deserialize, Serialize};
use std::fmt;

pub use smartstring::alias::String as AttrString;

pub const ATTR_ALIAS: &str = "alias";
pub const ATTR_CN: &str = "cn";
pub const ATTR_DN: &str = "dn";
pub const ATTR_FNLN: &str = "fnln";
pub const ATTR_GIVEN_NAME: &str = "givenName";
pub const ATTR_ID: &str = "id";
pub const ATTR_KOLAB_DELEGATE: &str = "kolabDelegate";
pub const ATTR_KOLAB_FOLDER_TYPE: &str = "kolabFolderType";
pub const ATTR_KOLAB_INVITATION_POLICY: &str = "kolabInvitationPolicy";
pub const ATTR_LNFN: &str = "lnfn";
pub const ATTR_MAIL: &str = "mail";
pub const ATTR_MEMBER: &str = "member";
pub const ATTR_OBJECTCLASS: &str = "objectClass";
pub const ATTR_SN: &str = "sn";
pub const ATTR_UID: &str = "uid";
pub const ATTR_USER_PASSWORD: &str = "userPassword";

/// The attributes the Kolab tree gives meaning to. Anything else is carried as `Custom`.
///
/// Directory attribute names are case insensitive, so parsing folds case while
/// [`Attribute::as_str`] returns the spelling used on the wire.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
#[serde(from = "AttrString", into = "AttrString")]
pub enum Attribute {
    Alias,
    Cn,
    Dn,
    Fnln,
    GivenName,
    Id,
    KolabDelegate,
    KolabFolderType,
    KolabInvitationPolicy,
    Lnfn,
    Mail,
    Member,
    ObjectClass,
    Sn,
    Uid,
    UserPassword,
    Custom(AttrString),
}

impl AsRef<str> for Attribute {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for Attribute {
    fn from(value: &str) -> Self {
        Self::from_str(value)
    }
}

impl From<AttrString> for Attribute {
    fn from(value: AttrString) -> Self {
        Self::from_str(value.as_str())
    }
}

impl From<Attribute> for AttrString {
    fn from(val: Attribute) -> Self {
        AttrString::from(val.as_str())
    }
}

impl Attribute {
    pub fn as_str(&self) -> &str {
        match self {
            Attribute::Alias => ATTR_ALIAS,
            Attribute::Cn => ATTR_CN,
            Attribute::Dn => ATTR_DN,
            Attribute::Fnln => ATTR_FNLN,
            Attribute::GivenName => ATTR_GIVEN_NAME,
            Attribute::Id => ATTR_ID,
            Attribute::KolabDelegate => ATTR_KOLAB_DELEGATE,
            Attribute::KolabFolderType => ATTR_KOLAB_FOLDER_TYPE,
            Attribute::KolabInvitationPolicy => ATTR_KOLAB_INVITATION_POLICY,
            Attribute::Lnfn => ATTR_LNFN,
            Attribute::Mail => ATTR_MAIL,
            Attribute::Member => ATTR_MEMBER,
            Attribute::ObjectClass => ATTR_OBJECTCLASS,
            Attribute::Sn => ATTR_SN,
            Attribute::Uid => ATTR_UID,
            Attribute::UserPassword => ATTR_USER_PASSWORD,
            Attribute::Custom(value) => value.as_str(),
        }
    }

    /// The case folded form, which is how entries key their attributes.
    pub fn folded(&self) -> AttrString {
        fold_attr(self.as_str())
    }

    // We allow this because the standard lib from_str is fallible, and we want an infallible version.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(value: &str) -> Self {
        match fold_attr(value).as_str() {
            "alias" => Attribute::Alias,
            "cn" => Attribute::Cn,
            "dn" => Attribute::Dn,
            "fnln" => Attribute::Fnln,
            "givenname" => Attribute::GivenName,
            "id" => Attribute::Id,
            "kolabdelegate" => Attribute::KolabDelegate,
            "kolabfoldertype" => Attribute::KolabFolderType,
            "kolabinvitationpolicy" => Attribute::KolabInvitationPolicy,
            "lnfn" => Attribute::Lnfn,
            "mail" => Attribute::Mail,
            "member" => Attribute::Member,
            "objectclass" => Attribute::ObjectClass,
            "sn" => Attribute::Sn,
            "uid" => Attribute::Uid,
            "userpassword" => Attribute::UserPassword,
            _ => Attribute::Custom(AttrString::from(value)),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fold an attribute name to the form used for keying and comparison.
pub fn fold_attr(value: &str) -> AttrString {
    let mut folded = AttrString::new();
    value
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .for_each(|c| folded.push(c));
    folded
}

#[cfg(test)]
mod test {
    use super::{fold_attr, Attribute};

    #[test]
    fn test_attribute_from_str() {
        assert_eq!(Attribute::ObjectClass, Attribute::from_str("OBJECTCLASS"));
        assert_eq!(Attribute::ObjectClass, Attribute::from_str("objectClass"));
        assert_eq!(
            Attribute::KolabDelegate,
            Attribute::from_str("kolabdelegate")
        );
    }

    #[test]
    fn test_attribute_as_str() {
        assert_eq!(Attribute::ObjectClass.as_str(), "objectClass");
        assert_eq!(Attribute::ObjectClass.folded().as_str(), "objectclass");
        assert_eq!(Attribute::from("jpegPhoto").to_string(), "jpegPhoto");
    }

    #[test]
    fn test_attribute_serde() {
        let json = serde_json::to_string(&Attribute::KolabDelegate).expect("serialise");
        assert_eq!(json, r#""kolabDelegate""#);
        let back: Attribute = serde_json::from_str(r#""KOLABDELEGATE""#).expect("deserialise");
        assert_eq!(back, Attribute::KolabDelegate);
    }

    #[test]
    fn test_fold_attr() {
        assert_eq!(fold_attr(" GivenName ").as_str(), "givenname");
    }
}
