//! Sub-resource framing: the internal/external tagging scheme a resource
//! uses to save itself either inline or as a pointer to its own file.
//!
//! Grounded in `examples/original_source/source/module/resource/private/
//! resource.cpp`'s `resource::save_to`/`load_from` (`subresource_type`
//! enum `{ internal = 'i', external = 'e' }` written ahead of the payload).

use engine_common::{EngineError, EngineResult};

use crate::framer::{FileMode, Framer};

const TAG_INTERNAL: u8 = b'i';
const TAG_EXTERNAL: u8 = b'e';

/// A type that can frame itself to/from a [`Framer`]. Implemented by every
/// concrete resource type (mesh, material, shader).
pub trait FileBacked: Sized + Default {
    fn write_data(&self, framer: &mut Framer) -> EngineResult<()>;
    fn read_data(&mut self, framer: &mut Framer) -> EngineResult<()>;
}

/// Save a sub-resource into `framer`: inline if `external_path` is `None`,
/// or as a path reference if given (the referenced file is expected to be
/// written separately -- this never recurses into writing it).
pub fn save_subresource<T: FileBacked>(
    value: &T,
    external_path: Option<&str>,
    framer: &mut Framer,
) -> EngineResult<()> {
    match external_path {
        Some(path) => {
            framer.write_var(TAG_EXTERNAL)?;
            framer.write_string(path)?;
        }
        None => {
            framer.write_var(TAG_INTERNAL)?;
            value.write_data(framer)?;
        }
    }
    Ok(())
}

/// Load a sub-resource from `framer`, following an external path if tagged.
pub fn load_subresource<T: FileBacked>(framer: &mut Framer) -> EngineResult<T> {
    let tag = framer.read_var::<u8>()?;
    let mut value = T::default();
    match tag {
        TAG_EXTERNAL => {
            let path = framer.read_string()?;
            let mut sub_framer = Framer::open(&path, FileMode::Read);
            if !sub_framer.is_valid() {
                return Err(EngineError::Io(format!("failed to open subresource file '{path}'")).logged());
            }
            value.read_data(&mut sub_framer)?;
        }
        TAG_INTERNAL => {
            value.read_data(framer)?;
        }
        other => {
            return Err(EngineError::Io(format!("unrecognized subresource tag '{other}'")).logged());
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, PartialEq, Debug)]
    struct Dummy {
        value: u32,
    }

    impl FileBacked for Dummy {
        fn write_data(&self, framer: &mut Framer) -> EngineResult<()> {
            framer.write_var(self.value)
        }
        fn read_data(&mut self, framer: &mut Framer) -> EngineResult<()> {
            self.value = framer.read_var()?;
            Ok(())
        }
    }

    #[test]
    fn internal_subresource_round_trips_inline() {
        let path = std::env::temp_dir()
            .join(format!("engine-resources-subres-{}", std::process::id()))
            .to_string_lossy()
            .into_owned();
        {
            let mut w = Framer::open(&path, FileMode::Write);
            save_subresource(&Dummy { value: 7 }, None, &mut w).unwrap();
        }
        {
            let mut r = Framer::open(&path, FileMode::Read);
            let loaded: Dummy = load_subresource(&mut r).unwrap();
            assert_eq!(loaded, Dummy { value: 7 });
        }
        std::fs::remove_file(&path).ok();
    }
}
