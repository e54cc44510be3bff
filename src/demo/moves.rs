//! demo::moves
//!
//! Value scenarios: moving versus cloning owned heap data.
//!
//! A Rust move is a bitwise transfer that ends the source binding, so there
//! is no moved-from object to clean up and no self-assignment to guard
//! against. Copies only happen through an explicit `clone`.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::{Scenario, Transcript};

/// A heap buffer whose copies are always explicit.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Buffer {
    data: Vec<i32>,
}

impl Buffer {
    pub fn new(size: usize) -> Self {
        trace!(size, "buffer constructed");
        Self {
            data: vec![0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Address of the storage, for showing that a move keeps it.
    pub fn storage(&self) -> *const i32 {
        self.data.as_ptr()
    }
}

impl Clone for Buffer {
    fn clone(&self) -> Self {
        debug!(size = self.data.len(), "buffer deep-copied");
        Self {
            data: self.data.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        debug!(size = source.data.len(), "buffer copied into existing storage");
        self.data.clone_from(&source.data);
    }
}

/// A resource that can change owners but never be duplicated.
#[derive(Debug)]
pub struct MoveOnlyResource {
    data: Box<[i32]>,
}

impl MoveOnlyResource {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![42; size].into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn sum(&self) -> i64 {
        self.data.iter().map(|&v| i64::from(v)).sum()
    }
}

impl Drop for MoveOnlyResource {
    fn drop(&mut self) {
        trace!(size = self.data.len(), "move-only resource dropped");
    }
}

/// A value that is expensive to copy and cheap to move.
#[derive(Debug, Clone)]
pub struct HeavyResource {
    data: Vec<f64>,
    name: String,
}

impl HeavyResource {
    pub fn new(size: usize, name: impl Into<String>) -> Self {
        Self {
            data: vec![std::f64::consts::PI; size],
            name: name.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Build a boxed `T` from `args`. The arguments reach `build` exactly as
/// the caller passed them: owned values are moved in, borrows stay borrows.
pub fn make_logged<T, A>(args: A, build: impl FnOnce(A) -> T) -> Box<T> {
    debug!(
        resource = std::any::type_name::<T>(),
        args = std::any::type_name::<A>(),
        "creating resource"
    );
    Box::new(build(args))
}

/// Move a buffer, clone it, take from it, and fill a vector.
pub fn buffer() -> Transcript {
    let mut out = Transcript::new(Scenario::Buffer);

    let buf1 = Buffer::new(1000);
    let storage = buf1.storage();
    out.line(format!("buf1: {} elements", buf1.len()));

    let buf2 = buf1;
    out.line(format!(
        "buf1 moved into buf2: {} elements, same storage: {}",
        buf2.len(),
        buf2.storage() == storage
    ));

    let mut buf3 = buf2.clone();
    out.line(format!(
        "buf2 cloned into buf3: {} elements, same storage: {}",
        buf3.len(),
        buf3.storage() == buf2.storage()
    ));

    let mut buf4 = Buffer::new(500);
    let buf5 = std::mem::take(&mut buf4);
    out.line(format!(
        "mem::take: buf5 has {} elements, buf4 left valid and empty: {}",
        buf5.len(),
        buf4.is_empty()
    ));

    let capacity = buf3.capacity();
    buf3.clone_from(&buf5);
    out.line(format!(
        "buf3.clone_from(&buf5): {} elements, allocation kept: {}",
        buf3.len(),
        buf3.capacity() >= capacity
    ));

    let make_buffer = || Buffer::new(500);
    let returned = make_buffer();
    out.line(format!(
        "returned by value: {} elements, no copy",
        returned.len()
    ));

    let mut buffers = Vec::with_capacity(3);
    buffers.push(Buffer::new(100));
    buffers.push(Buffer::new(200));
    buffers.push(returned);
    out.line(format!(
        "vector holds {} buffers, all moved in",
        buffers.len()
    ));

    out
}

/// Hand a move-only resource from owner to owner.
pub fn move_only() -> Transcript {
    let mut out = Transcript::new(Scenario::MoveOnly);

    let res1 = MoveOnlyResource::new(100);
    out.line(format!("res1: {} elements, sum {}", res1.len(), res1.sum()));

    let res2 = res1;
    out.line(format!("res1 moved into res2: {} elements", res2.len()));
    out.line("MoveOnlyResource has no Clone; a copy does not compile");

    let mut resources = vec![res2];
    resources.push(MoveOnlyResource::new(50));
    let total: usize = resources.iter().map(MoveOnlyResource::len).sum();
    out.line(format!(
        "vector owns {} resources, {total} elements total",
        resources.len()
    ));

    drop(resources);
    out.line("vector dropped; every resource released exactly once");

    let owned = String::from("rvalue");
    let storage = owned.as_ptr();
    let moved = make_logged((4, owned), |(size, name)| HeavyResource::new(size, name));
    out.line(format!(
        "factory given an owned String: moved through, same storage: {}",
        moved.name().as_ptr() == storage
    ));

    let kept = String::from("lvalue");
    let copied = make_logged((4, kept.as_str()), |(size, name)| {
        HeavyResource::new(size, name)
    });
    out.line(format!(
        "factory given a &str: copied into \"{}\", caller still has \"{kept}\"",
        copied.name()
    ));
    out
}

/// Time pushing `iterations` clones against pushing `iterations` moves.
pub fn perf(iterations: usize, resource_size: usize) -> Transcript {
    let mut out = Transcript::new(Scenario::Perf);

    let copy = time_fill(iterations, resource_size, "Copy", |resources, temp| {
        resources.push(temp.clone());
    });
    let moved = time_fill(iterations, resource_size, "Move", |resources, temp| {
        resources.push(temp);
    });
    debug!(?copy, ?moved, iterations, resource_size, "copy/move timing");

    out.line(format!(
        "{iterations} resources of {resource_size} elements each"
    ));
    out.line(format!("copy: {:.3} ms", millis(copy)));
    out.line(format!("move: {:.3} ms", millis(moved)));
    if moved > Duration::ZERO {
        out.line(format!(
            "copy/move ratio: {:.1}x",
            copy.as_secs_f64() / moved.as_secs_f64()
        ));
    }
    out
}

fn time_fill(
    iterations: usize,
    resource_size: usize,
    prefix: &str,
    mut push: impl FnMut(&mut Vec<HeavyResource>, HeavyResource),
) -> Duration {
    let start = Instant::now();
    let mut resources = Vec::with_capacity(iterations);
    for i in 0..iterations {
        let temp = HeavyResource::new(resource_size, format!("{prefix}{i}"));
        push(&mut resources, temp);
    }
    drop(resources);
    start.elapsed()
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
