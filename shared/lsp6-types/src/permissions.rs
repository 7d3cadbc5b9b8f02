//! LSP6 permission bits.
//!
//! A controller's permissions are a 256-bit mask stored as a 32-byte word under
//! `AddressPermissions:Permissions:<address>`. Each named permission is one bit; bits combine
//! with bitwise OR.
//!
//! | bit | permission                        | value      |
//! |-----|-----------------------------------|------------|
//! | 0   | CHANGEOWNER                       | `0x01`     |
//! | 1   | ADDCONTROLLER                     | `0x02`     |
//! | 2   | EDITPERMISSIONS                   | `0x04`     |
//! | 3   | ADDEXTENSIONS                     | `0x08`     |
//! | 4   | CHANGEEXTENSIONS                  | `0x10`     |
//! | 5   | ADDUNIVERSALRECEIVERDELEGATE      | `0x20`     |
//! | 6   | CHANGEUNIVERSALRECEIVERDELEGATE   | `0x40`     |
//! | 7   | REENTRANCY                        | `0x80`     |
//! | 8   | SUPER_TRANSFERVALUE               | `0x100`    |
//! | 9   | TRANSFERVALUE                     | `0x200`    |
//! | 10  | SUPER_CALL                        | `0x400`    |
//! | 11  | CALL                              | `0x800`    |
//! | 12  | SUPER_STATICCALL                  | `0x1000`   |
//! | 13  | STATICCALL                        | `0x2000`   |
//! | 14  | SUPER_DELEGATECALL                | `0x4000`   |
//! | 15  | DELEGATECALL                      | `0x8000`   |
//! | 16  | DEPLOY                            | `0x10000`  |
//! | 17  | SUPER_SETDATA                     | `0x20000`  |
//! | 18  | SETDATA                           | `0x40000`  |
//! | 19  | ENCRYPT                           | `0x80000`  |
//! | 20  | DECRYPT                           | `0x100000` |
//! | 21  | SIGN                              | `0x200000` |
//! | 22  | EXECUTE_RELAY_CALL                | `0x400000` |
//! | 23  | ERC4337_PERMISSION                | `0x800000` |

use core::{fmt, ops::BitOr, str::FromStr};

use alloy_primitives::{B256, U256};

/// A single named capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Permission {
    ChangeOwner = 0,
    AddController = 1,
    EditPermissions = 2,
    AddExtensions = 3,
    ChangeExtensions = 4,
    AddUniversalReceiverDelegate = 5,
    ChangeUniversalReceiverDelegate = 6,
    Reentrancy = 7,
    SuperTransferValue = 8,
    TransferValue = 9,
    SuperCall = 10,
    Call = 11,
    SuperStaticCall = 12,
    StaticCall = 13,
    SuperDelegateCall = 14,
    DelegateCall = 15,
    Deploy = 16,
    SuperSetData = 17,
    SetData = 18,
    Encrypt = 19,
    Decrypt = 20,
    Sign = 21,
    ExecuteRelayCall = 22,
    Erc4337Permission = 23,
}

impl Permission {
    /// Every named permission, in bit order. This is also the order in which a missing
    /// permission is reported.
    pub const ALL: [Permission; 24] = [
        Permission::ChangeOwner,
        Permission::AddController,
        Permission::EditPermissions,
        Permission::AddExtensions,
        Permission::ChangeExtensions,
        Permission::AddUniversalReceiverDelegate,
        Permission::ChangeUniversalReceiverDelegate,
        Permission::Reentrancy,
        Permission::SuperTransferValue,
        Permission::TransferValue,
        Permission::SuperCall,
        Permission::Call,
        Permission::SuperStaticCall,
        Permission::StaticCall,
        Permission::SuperDelegateCall,
        Permission::DelegateCall,
        Permission::Deploy,
        Permission::SuperSetData,
        Permission::SetData,
        Permission::Encrypt,
        Permission::Decrypt,
        Permission::Sign,
        Permission::ExecuteRelayCall,
        Permission::Erc4337Permission,
    ];

    #[inline]
    pub const fn bit_index(self) -> u8 {
        self as u8
    }

    /// The single-bit mask for this permission.
    #[inline]
    pub const fn mask(self) -> Permissions {
        Permissions(U256::from_limbs([1u64 << (self as u8), 0, 0, 0]))
    }

    /// Canonical upper-case name, as reported in `NotAuthorised(address,string)`.
    pub const fn name(self) -> &'static str {
        match self {
            Permission::ChangeOwner => "CHANGEOWNER",
            Permission::AddController => "ADDCONTROLLER",
            Permission::EditPermissions => "EDITPERMISSIONS",
            Permission::AddExtensions => "ADDEXTENSIONS",
            Permission::ChangeExtensions => "CHANGEEXTENSIONS",
            Permission::AddUniversalReceiverDelegate => "ADDUNIVERSALRECEIVERDELEGATE",
            Permission::ChangeUniversalReceiverDelegate => "CHANGEUNIVERSALRECEIVERDELEGATE",
            Permission::Reentrancy => "REENTRANCY",
            Permission::SuperTransferValue => "SUPER_TRANSFERVALUE",
            Permission::TransferValue => "TRANSFERVALUE",
            Permission::SuperCall => "SUPER_CALL",
            Permission::Call => "CALL",
            Permission::SuperStaticCall => "SUPER_STATICCALL",
            Permission::StaticCall => "STATICCALL",
            Permission::SuperDelegateCall => "SUPER_DELEGATECALL",
            Permission::DelegateCall => "DELEGATECALL",
            Permission::Deploy => "DEPLOY",
            Permission::SuperSetData => "SUPER_SETDATA",
            Permission::SetData => "SETDATA",
            Permission::Encrypt => "ENCRYPT",
            Permission::Decrypt => "DECRYPT",
            Permission::Sign => "SIGN",
            Permission::ExecuteRelayCall => "EXECUTE_RELAY_CALL",
            Permission::Erc4337Permission => "ERC4337_PERMISSION",
        }
    }

    /// The SUPER_* counterpart that lifts the allow-list for this category, if any.
    pub const fn super_variant(self) -> Option<Permission> {
        match self {
            Permission::TransferValue => Some(Permission::SuperTransferValue),
            Permission::Call => Some(Permission::SuperCall),
            Permission::StaticCall => Some(Permission::SuperStaticCall),
            Permission::DelegateCall => Some(Permission::SuperDelegateCall),
            Permission::SetData => Some(Permission::SuperSetData),
            _ => None,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Permission {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Permission::ALL.get(value as usize).copied().ok_or(())
    }
}

/// Returned when parsing an unknown permission name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission `{0}`")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Permission::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or(UnknownPermission(s.to_string()))
    }
}

/// A 256-bit permission mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Permissions(U256);

impl Permissions {
    pub const NONE: Permissions = Permissions(U256::ZERO);

    /// Every permission except REENTRANCY, SUPER_DELEGATECALL, DELEGATECALL and
    /// ERC4337_PERMISSION.
    pub const ALL_PERMISSIONS: Permissions = Permissions(U256::from_limbs([0x7f3f7f, 0, 0, 0]));

    #[inline]
    pub const fn from_u256(raw: U256) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn into_u256(self) -> U256 {
        self.0
    }

    /// Interpret a stored data value. Anything but exactly 32 bytes reads as no permissions.
    pub fn from_word(value: &[u8]) -> Self {
        if value.len() != 32 {
            return Self::NONE;
        }
        Self(U256::from_be_slice(value))
    }

    /// The 32-byte big-endian word stored on-chain.
    pub fn to_word(self) -> B256 {
        B256::from(self.0.to_be_bytes::<32>())
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn has(self, permission: Permission) -> bool {
        self.contains(permission.mask())
    }

    /// True if every bit of `other` is set in `self`.
    #[inline]
    pub fn contains(self, other: Permissions) -> bool {
        (self.0 & other.0) == other.0
    }

    #[must_use]
    pub fn with(self, permission: Permission) -> Self {
        self | permission
    }

    #[must_use]
    pub fn without(self, permission: Permission) -> Self {
        Self(self.0 & !permission.mask().0)
    }

    /// First permission (in bit order) required by `required` but not held by `self`.
    pub fn first_missing(self, required: Permissions) -> Option<Permission> {
        Permission::ALL
            .into_iter()
            .find(|p| required.has(*p) && !self.has(*p))
    }

    /// Named permissions set in this mask, in bit order.
    pub fn iter(self) -> impl Iterator<Item = Permission> {
        Permission::ALL.into_iter().filter(move |p| self.has(*p))
    }
}

impl From<Permission> for Permissions {
    fn from(permission: Permission) -> Self {
        permission.mask()
    }
}

impl BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Permissions) -> Permissions {
        Permissions(self.0 | rhs.0)
    }
}

impl BitOr<Permission> for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Permission) -> Permissions {
        self | rhs.mask()
    }
}

impl BitOr for Permission {
    type Output = Permissions;

    fn bitor(self, rhs: Permission) -> Permissions {
        self.mask() | rhs.mask()
    }
}

impl FromIterator<Permission> for Permissions {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        iter.into_iter().fold(Permissions::NONE, |acc, p| acc | p)
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_values_match_lsp6_table() {
        assert_eq!(Permission::ChangeOwner.mask().into_u256(), U256::from(0x1));
        assert_eq!(Permission::Reentrancy.mask().into_u256(), U256::from(0x80));
        assert_eq!(Permission::SetData.mask().into_u256(), U256::from(0x40000));
        assert_eq!(Permission::ExecuteRelayCall.mask().into_u256(), U256::from(0x400000));
        assert_eq!(Permission::Erc4337Permission.mask().into_u256(), U256::from(0x800000));
    }

    #[test]
    fn all_permissions_excludes_dangerous_bits() {
        let all = Permissions::ALL_PERMISSIONS;
        assert!(!all.has(Permission::Reentrancy));
        assert!(!all.has(Permission::DelegateCall));
        assert!(!all.has(Permission::SuperDelegateCall));
        assert!(all.has(Permission::SuperCall));
        assert!(all.has(Permission::ExecuteRelayCall));
    }

    #[test]
    fn word_round_trip_and_malformed_reads() {
        let perms = Permission::Call | Permission::TransferValue;
        assert_eq!(Permissions::from_word(perms.to_word().as_slice()), perms);
        assert_eq!(Permissions::from_word(&[0xff; 31]), Permissions::NONE);
        assert_eq!(Permissions::from_word(&[]), Permissions::NONE);
    }

    #[test]
    fn first_missing_follows_bit_order() {
        let held = Permissions::from(Permission::Call);
        let required = Permission::Call | Permission::TransferValue;
        assert_eq!(held.first_missing(required), Some(Permission::TransferValue));
        assert_eq!(required.first_missing(required), None);
    }

    #[test]
    fn names_parse_back() {
        for p in Permission::ALL {
            assert_eq!(p.name().parse::<Permission>(), Ok(p));
            assert_eq!(Permission::try_from(p.bit_index()), Ok(p));
        }
        assert!("NOT_A_PERMISSION".parse::<Permission>().is_err());
    }
}
