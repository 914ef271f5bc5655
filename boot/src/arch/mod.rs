/// Architecture support. Only x86_64 UEFI is targeted.
pub mod x86_64;
