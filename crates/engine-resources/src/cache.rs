//! Path-keyed, reference-counted resource cache: load a resource once per
//! path, hand out cheap handles for subsequent loads of the same path, and
//! evict + publish an event once the last handle is dropped.
//!
//! Grounded in `examples/original_source/source/module/resource/public/
//! resource_database.hpp` (`resource_database::load`, which returns an
//! existing entry when the path is already loaded) and `resource.hpp`'s
//! `resource::reference<T>` (add/remove reference on construction/
//! destruction, firing `resource_no_longer_referenced` at zero). Rust's
//! `Rc` strong count replaces the original's manual counter, and
//! `ResourceHandle`'s `Drop` replaces the reference type's destructor.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use engine_common::{Event, EngineResult, Handler};

use crate::framer::{FileMode, Framer};
use crate::resource::FileBacked;

struct CacheInner<T> {
    entries: HashMap<String, (Rc<RefCell<T>>, Rc<Cell<bool>>)>,
    resource_no_longer_referenced: Event<String>,
}

/// Caches resources of type `T` by their file path.
pub struct ResourceCache<T: FileBacked> {
    inner: Rc<RefCell<CacheInner<T>>>,
}

impl<T: FileBacked> Default for ResourceCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FileBacked> ResourceCache<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(CacheInner {
                entries: HashMap::new(),
                resource_no_longer_referenced: Event::new("resource_no_longer_referenced"),
            })),
        }
    }

    /// Load `path`, reusing an already-cached resource if present. A failed
    /// file open or a read error leaves the resource at its `Default`
    /// rather than failing the whole load -- the handle is still returned,
    /// just with [`ResourceHandle::is_valid`] reporting `false`.
    pub fn load(&self, path: &str) -> EngineResult<ResourceHandle<T>> {
        let existing = self.inner.borrow().entries.get(path).cloned();
        let (data, valid) = match existing {
            Some(entry) => entry,
            None => {
                let mut value = T::default();
                let mut framer = Framer::open(path, FileMode::Read);
                let valid = framer.is_valid() && value.read_data(&mut framer).is_ok();
                let rc = Rc::new(RefCell::new(value));
                let valid = Rc::new(Cell::new(valid));
                self.inner.borrow_mut().entries.insert(path.to_string(), (Rc::clone(&rc), Rc::clone(&valid)));
                (rc, valid)
            }
        };
        Ok(ResourceHandle {
            path: path.to_string(),
            data,
            valid,
            cache: Rc::clone(&self.inner),
        })
    }

    /// Insert an already-constructed value under `path`, as if it had been
    /// loaded from a file. Used by procedurally-generated resources (e.g.
    /// `crate::primitives`) that still want cache/reference-counting
    /// semantics without an on-disk file.
    pub fn insert(&self, path: &str, value: T) -> ResourceHandle<T> {
        let rc = Rc::new(RefCell::new(value));
        let valid = Rc::new(Cell::new(true));
        self.inner.borrow_mut().entries.insert(path.to_string(), (Rc::clone(&rc), Rc::clone(&valid)));
        ResourceHandle {
            path: path.to_string(),
            data: rc,
            valid,
            cache: Rc::clone(&self.inner),
        }
    }

    pub fn is_loaded(&self, path: &str) -> bool {
        self.inner.borrow().entries.contains_key(path)
    }

    pub fn on_no_longer_referenced(&self, callback: impl FnMut(&String) + 'static) -> Handler<String> {
        self.inner.borrow().resource_no_longer_referenced.subscribe(callback)
    }
}

/// A live reference to a cached resource. Cloning increments the reference
/// count (cheap, shares the underlying data); dropping the last clone
/// evicts the entry from the owning cache and fires
/// `resource_no_longer_referenced`.
pub struct ResourceHandle<T: FileBacked> {
    path: String,
    data: Rc<RefCell<T>>,
    valid: Rc<Cell<bool>>,
    cache: Rc<RefCell<CacheInner<T>>>,
}

impl<T: FileBacked> ResourceHandle<T> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn get(&self) -> Ref<'_, T> {
        self.data.borrow()
    }

    pub fn get_mut(&self) -> RefMut<'_, T> {
        self.data.borrow_mut()
    }

    pub fn reference_count(&self) -> usize {
        Rc::strong_count(&self.data) - 1 // subtract the cache's own copy
    }

    /// `false` when the backing file failed to open or failed to parse;
    /// the resource itself is still a usable `Default` in that case.
    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }
}

impl<T: FileBacked> Clone for ResourceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            data: Rc::clone(&self.data),
            valid: Rc::clone(&self.valid),
            cache: Rc::clone(&self.cache),
        }
    }
}

impl<T: FileBacked> Drop for ResourceHandle<T> {
    fn drop(&mut self) {
        // strong_count == 2 means only this handle and the cache's map
        // entry remain; once this drop completes, only the cache holds it.
        if Rc::strong_count(&self.data) == 2 {
            let mut inner = self.cache.borrow_mut();
            inner.entries.remove(&self.path);
            inner.resource_no_longer_referenced.publish(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc as StdRc;

    #[derive(Default)]
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
    fn repeated_load_shares_the_same_entry() {
        let cache: ResourceCache<Dummy> = ResourceCache::new();
        let a = cache.insert("mem://a", Dummy { value: 1 });
        let b = cache.load("mem://a").unwrap();
        b.get_mut().value = 42;
        assert_eq!(a.get().value, 42);
    }

    #[test]
    fn failed_open_leaves_a_default_resource_behind_an_invalid_handle() {
        let cache: ResourceCache<Dummy> = ResourceCache::new();
        let handle = cache.load("/nonexistent/engine-resources-cache-test-path").unwrap();
        assert!(!handle.is_valid());
        assert_eq!(handle.get().value, 0);
    }

    #[test]
    fn dropping_last_handle_evicts_and_fires_event() {
        let cache: ResourceCache<Dummy> = ResourceCache::new();
        let evicted = StdRc::new(Cell::new(false));
        let flag = StdRc::clone(&evicted);
        let _handler = cache.on_no_longer_referenced(move |_path| flag.set(true));

        let handle = cache.insert("mem://b", Dummy { value: 5 });
        assert!(cache.is_loaded("mem://b"));
        drop(handle);

        assert!(!cache.is_loaded("mem://b"));
        assert!(evicted.get());
    }

    #[test]
    fn dropping_one_of_several_handles_does_not_evict() {
        let cache: ResourceCache<Dummy> = ResourceCache::new();
        let a = cache.insert("mem://c", Dummy { value: 9 });
        let b = a.clone();
        drop(a);
        assert!(cache.is_loaded("mem://c"));
        assert_eq!(b.get().value, 9);
    }
}
