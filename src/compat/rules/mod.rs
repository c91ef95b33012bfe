//! Built-in validation rules, grouped by the descriptor kind they inspect.

pub mod enums;
pub mod field;
pub mod file;
pub mod method;
pub mod naming;
pub mod removal;

pub use enums::{EnumDefaultValueRule, EnumValueNameChangeRule};
pub use field::{
    FieldJsonNameRule, FieldLabelRule, FieldNameChangeRule, FieldNumberRule,
    FieldTypeCompatibilityRule,
};
pub use file::{FilePathAndPackageMatchRule, JavaPackageRule, PackageRequiredRule};
pub use method::{
    MethodClientStreamingRule, MethodIdempotencyRule, MethodInputTypeRule, MethodOutputTypeRule,
    MethodServerStreamingRule,
};
pub use naming::{
    EnumNamingRule, EnumValueNamingRule, FieldNamingRule, MessageNamingRule, MethodNamingRule,
    OneofNamingRule, PackageNamingRule, ServiceNamingRule,
};
pub use removal::{
    EnumRemovalRule, EnumValueRemovalRule, FieldRemovalRule, MessageRemovalRule,
    MethodRemovalRule, ServiceRemovalRule,
};
