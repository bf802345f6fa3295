#[cfg(feature = "systick")]
mod systick;

#[cfg(feature = "systick")]
pub use self::systick::SysTickRegisters;
