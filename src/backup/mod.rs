pub mod borg;
pub mod command;
pub mod job;
pub mod naming;
pub mod notifications;
pub mod proxmox;
pub mod redacted;
pub mod result_error;
pub mod validate;
pub mod version;

#[cfg(test)]
pub(crate) mod test_support;

macro_rules! function_path {
    () => {
        concat!(module_path!(), "::", function_name!(), " ", file!(), ":", line!())
    };
}

pub(crate) use function_path;
