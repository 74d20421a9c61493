//! Type-safe, generation-counted handles for GL object names.
//!
//! Handles are the internal replacement for the raw `u32` names
//! `glGenBuffers`/`glGenTextures`/etc. hand out: the resource model keeps a
//! `Handle<T>` in every GL-facing name table instead of a bare index, so a
//! stale name from a deleted-then-recreated slot can never alias a live
//! object. They provide:
//!
//! - **Type safety**: Handles are generic over the resource type, preventing
//!   accidental use of a texture handle where a shader handle is expected.
//! - **Generation counting**: Each handle includes a generation counter that
//!   increments when a slot is reused, preventing use-after-free bugs.
//! - **FFI compatibility**: The `#[repr(C)]` layout ensures consistent memory
//!   representation, the same property the GL names these replace relied on.
//!
//! # Design Pattern: Generational Indices
//!
//! Generational indices solve the ABA problem in resource management:
//!
//! 1. Allocate slot 5, generation 1 -> Handle(5, 1)
//! 2. Deallocate slot 5, generation becomes 2
//! 3. Allocate slot 5 again, generation 2 -> Handle(5, 2)
//! 4. Old Handle(5, 1) is now invalid (generation mismatch)
//!
//! # Example
//!
//! ```
//! use pica_gl::core::handle::Handle;
//!
//! // Marker type for textures
//! struct Texture;
//!
//! // Create a handle (normally done by HandleAllocator)
//! let handle: Handle<Texture> = Handle::new(0, 1);
//!
//! assert_eq!(handle.index(), 0);
//! assert_eq!(handle.generation(), 1);
//! assert!(handle.is_valid());
//!
//! // Invalid handle for representing "no resource"
//! let invalid: Handle<Texture> = Handle::INVALID;
//! assert!(!invalid.is_valid());
//! ```

use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

// =============================================================================
// HandleAllocator
// =============================================================================

/// Manages handle allocation with generation counting and free-list recycling.
///
/// The `HandleAllocator` is responsible for creating and invalidating handles
/// in a memory-efficient manner. It uses a generational index scheme where:
///
/// - Each slot has a generation counter that increments on deallocation
/// - Deallocated slots are recycled via a free list
/// - Handles carry their generation, allowing stale handle detection
///
/// # Design Pattern: Generational Arena Allocator
///
/// This pattern provides:
/// - O(1) allocation (pop from free list or push new entry)
/// - O(1) deallocation (push to free list, increment generation)
/// - O(1) liveness check (compare generations)
/// - Memory reuse without use-after-free bugs
///
/// # Example
///
/// ```
/// use pica_gl::core::handle::HandleAllocator;
///
/// struct Texture;
///
/// let mut allocator: HandleAllocator<Texture> = HandleAllocator::new();
///
/// // Allocate some handles
/// let h1 = allocator.allocate();
/// let h2 = allocator.allocate();
///
/// assert!(allocator.is_alive(h1));
/// assert!(allocator.is_alive(h2));
///
/// // Deallocate h1
/// assert!(allocator.deallocate(h1));
/// assert!(!allocator.is_alive(h1));  // h1 is now stale
///
/// // Allocate again - may reuse h1's slot with new generation
/// let h3 = allocator.allocate();
/// assert!(allocator.is_alive(h3));
///
/// // h1 still references old generation, so it's still not alive
/// assert!(!allocator.is_alive(h1));
/// ```
///
/// # Thread Safety
///
/// `HandleAllocator` is NOT thread-safe. For concurrent access, wrap in
/// appropriate synchronization primitives (Mutex, RwLock, etc.).
pub struct HandleAllocator<T> {
    /// Generation counter for each slot.
    ///
    /// Index `i` stores the current generation for slot `i`.
    /// Generation starts at 1 for new slots (0 is reserved for never-allocated).
    generations: Vec<u32>,

    /// Stack of free slot indices available for reuse.
    ///
    /// When a handle is deallocated, its index is pushed here.
    /// On allocation, we prefer to pop from this list before growing.
    free_list: Vec<u32>,

    /// Phantom marker for type parameter.
    _marker: PhantomData<T>,
}

impl<T> HandleAllocator<T> {
    /// Creates a new, empty handle allocator.
    ///
    /// The allocator starts with no pre-allocated capacity.
    /// Use [`with_capacity`](Self::with_capacity) for bulk allocation scenarios.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleAllocator;
    ///
    /// struct Mesh;
    ///
    /// let allocator: HandleAllocator<Mesh> = HandleAllocator::new();
    /// assert_eq!(allocator.len(), 0);
    /// assert!(allocator.is_empty());
    /// ```
    #[inline]
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            free_list: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Creates a new handle allocator with pre-allocated capacity.
    ///
    /// This is useful when you know approximately how many handles you'll need,
    /// as it avoids repeated reallocations during bulk allocation.
    ///
    /// Note that this only pre-allocates memory for the internal vectors;
    /// it does not create any handles. Use [`allocate`](Self::allocate) to
    /// actually create handles.
    ///
    /// # Arguments
    ///
    /// * `capacity` - The number of slots to pre-allocate
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleAllocator;
    ///
    /// struct Entity;
    ///
    /// // Pre-allocate space for 1000 entities
    /// let mut allocator: HandleAllocator<Entity> = HandleAllocator::with_capacity(1000);
    ///
    /// // No handles allocated yet, but memory is reserved
    /// assert_eq!(allocator.len(), 0);
    /// assert!(allocator.is_empty());
    ///
    /// // Allocations up to 1000 won't cause reallocation
    /// for _ in 0..1000 {
    ///     allocator.allocate();
    /// }
    /// assert_eq!(allocator.len(), 1000);
    /// ```
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            generations: Vec::with_capacity(capacity),
            free_list: Vec::new(), // Free list starts empty, no freed slots yet
            _marker: PhantomData,
        }
    }

    /// Allocates a new handle.
    ///
    /// If there are slots in the free list, one is reused with an incremented
    /// generation. Otherwise, a new slot is created with generation 1.
    ///
    /// # Returns
    ///
    /// A new, valid handle that can be used to reference a resource.
    ///
    /// # Panics
    ///
    /// Panics if the number of slots exceeds `u32::MAX - 1` (unlikely in practice).
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleAllocator;
    ///
    /// struct Shader;
    ///
    /// let mut allocator: HandleAllocator<Shader> = HandleAllocator::new();
    ///
    /// let h1 = allocator.allocate();
    /// let h2 = allocator.allocate();
    ///
    /// assert_ne!(h1, h2);
    /// assert!(h1.is_valid());
    /// assert!(h2.is_valid());
    /// ```
    pub fn allocate(&mut self) -> Handle<T> {
        if let Some(index) = self.free_list.pop() {
            // Reuse a slot from the free list
            // Generation was already incremented during deallocation
            let generation = self.generations[index as usize];
            Handle::new(index, generation)
        } else {
            // Allocate a new slot
            let index = self.generations.len();

            // Ensure we don't exceed u32::MAX - 1 (reserve MAX for INVALID)
            assert!(
                index < u32::MAX as usize,
                "HandleAllocator exceeded maximum capacity"
            );

            // New slots start at generation 1 (0 is reserved for never-allocated/INVALID)
            self.generations.push(1);

            Handle::new(index as u32, 1)
        }
    }

    /// Deallocates a handle, making it invalid.
    ///
    /// The slot's generation is incremented, invalidating any handles that
    /// reference the old generation. The slot is added to the free list for
    /// future reuse.
    ///
    /// # Arguments
    ///
    /// * `handle` - The handle to deallocate
    ///
    /// # Returns
    ///
    /// - `true` if the handle was valid and successfully deallocated
    /// - `false` if the handle was invalid (wrong generation, out of bounds, or INVALID)
    ///
    /// # Double Deallocation
    ///
    /// Attempting to deallocate the same handle twice returns `false` on the
    /// second attempt, as the generation will have already been incremented.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleAllocator;
    ///
    /// struct Audio;
    ///
    /// let mut allocator: HandleAllocator<Audio> = HandleAllocator::new();
    /// let handle = allocator.allocate();
    ///
    /// assert!(allocator.is_alive(handle));
    /// assert!(allocator.deallocate(handle));  // First deallocation succeeds
    /// assert!(!allocator.is_alive(handle));
    /// assert!(!allocator.deallocate(handle)); // Second deallocation fails
    /// ```
    pub fn deallocate(&mut self, handle: Handle<T>) -> bool {
        // Check if handle is valid
        if !handle.is_valid() {
            return false;
        }

        let index = handle.index() as usize;

        // Check bounds
        if index >= self.generations.len() {
            return false;
        }

        // Check generation matches (handle is still alive)
        if self.generations[index] != handle.generation() {
            return false;
        }

        // Increment generation to invalidate existing handles
        // Wrap at u32::MAX to 1 (skip 0, which is reserved)
        let new_gen = self.generations[index].wrapping_add(1);
        self.generations[index] = if new_gen == 0 { 1 } else { new_gen };

        // Add to free list for reuse
        self.free_list.push(handle.index());

        true
    }

    /// Checks if a handle refers to a currently allocated resource.
    ///
    /// A handle is "alive" if:
    /// - It is not the INVALID sentinel
    /// - Its index is within bounds
    /// - Its generation matches the current slot generation
    ///
    /// # Arguments
    ///
    /// * `handle` - The handle to check
    ///
    /// # Returns
    ///
    /// `true` if the handle is alive, `false` otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleAllocator;
    ///
    /// struct Sprite;
    ///
    /// let mut allocator: HandleAllocator<Sprite> = HandleAllocator::new();
    /// let handle = allocator.allocate();
    ///
    /// assert!(allocator.is_alive(handle));
    ///
    /// allocator.deallocate(handle);
    /// assert!(!allocator.is_alive(handle));
    /// ```
    #[inline]
    pub fn is_alive(&self, handle: Handle<T>) -> bool {
        // INVALID handles are never alive
        if !handle.is_valid() {
            return false;
        }

        let index = handle.index() as usize;

        // Check bounds and generation
        index < self.generations.len() && self.generations[index] == handle.generation()
    }

    /// Returns the number of currently allocated (alive) handles.
    ///
    /// This is the total capacity minus the number of free slots.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleAllocator;
    ///
    /// struct Entity;
    ///
    /// let mut allocator: HandleAllocator<Entity> = HandleAllocator::new();
    /// assert_eq!(allocator.len(), 0);
    ///
    /// let h1 = allocator.allocate();
    /// let h2 = allocator.allocate();
    /// assert_eq!(allocator.len(), 2);
    ///
    /// allocator.deallocate(h1);
    /// assert_eq!(allocator.len(), 1);
    /// ```
    #[inline]
    pub fn len(&self) -> usize {
        self.generations.len() - self.free_list.len()
    }

    /// Returns the total number of slots (both allocated and free).
    ///
    /// This represents the high-water mark of allocations.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleAllocator;
    ///
    /// struct Component;
    ///
    /// let mut allocator: HandleAllocator<Component> = HandleAllocator::new();
    /// let h1 = allocator.allocate();
    /// let h2 = allocator.allocate();
    ///
    /// assert_eq!(allocator.capacity(), 2);
    ///
    /// allocator.deallocate(h1);
    /// // Capacity remains 2, even though one slot is free
    /// assert_eq!(allocator.capacity(), 2);
    /// ```
    #[inline]
    pub fn capacity(&self) -> usize {
        self.generations.len()
    }

    /// Returns `true` if no handles are currently allocated.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleAllocator;
    ///
    /// struct Resource;
    ///
    /// let mut allocator: HandleAllocator<Resource> = HandleAllocator::new();
    /// assert!(allocator.is_empty());
    ///
    /// let handle = allocator.allocate();
    /// assert!(!allocator.is_empty());
    ///
    /// allocator.deallocate(handle);
    /// assert!(allocator.is_empty());
    /// ```
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all allocations, invalidating all existing handles.
    ///
    /// This increments the generation of every slot, making all previously
    /// allocated handles stale. The capacity is retained, but `len()` becomes 0.
    ///
    /// Use this for "reset to initial state" scenarios, like level transitions
    /// in a game where all entities should be destroyed.
    ///
    /// # Performance
    ///
    /// This operation is O(n) where n is the capacity (number of slots).
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleAllocator;
    ///
    /// struct Entity;
    ///
    /// let mut allocator: HandleAllocator<Entity> = HandleAllocator::new();
    ///
    /// let h1 = allocator.allocate();
    /// let h2 = allocator.allocate();
    /// let h3 = allocator.allocate();
    ///
    /// assert_eq!(allocator.len(), 3);
    /// assert!(allocator.is_alive(h1));
    ///
    /// allocator.clear();
    ///
    /// // All handles are now invalid
    /// assert_eq!(allocator.len(), 0);
    /// assert!(allocator.is_empty());
    /// assert!(!allocator.is_alive(h1));
    /// assert!(!allocator.is_alive(h2));
    /// assert!(!allocator.is_alive(h3));
    ///
    /// // Capacity is retained
    /// assert_eq!(allocator.capacity(), 3);
    ///
    /// // New allocations get incremented generations
    /// let h4 = allocator.allocate();
    /// assert_eq!(h4.generation(), 2);  // Was 1, now 2
    /// ```
    pub fn clear(&mut self) {
        // Increment all generations to invalidate existing handles
        for gen in &mut self.generations {
            let new_gen = gen.wrapping_add(1);
            *gen = if new_gen == 0 { 1 } else { new_gen };
        }

        // Rebuild free list with all slots
        self.free_list.clear();
        self.free_list.reserve(self.generations.len());
        for i in (0..self.generations.len()).rev() {
            self.free_list.push(i as u32);
        }
    }

    /// Shrinks the free list to fit its current contents.
    ///
    /// This reduces memory usage by releasing excess capacity in the free list.
    /// Note that this does NOT shrink the generations vector, as that would
    /// invalidate the capacity guarantee and require more complex bookkeeping.
    ///
    /// Call this after a batch of deallocations if you want to reduce memory
    /// pressure and don't expect to allocate more handles soon.
    ///
    /// # Performance
    ///
    /// This operation may reallocate the free list, which is O(n) where n is
    /// the number of free slots.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleAllocator;
    ///
    /// struct Resource;
    ///
    /// let mut allocator: HandleAllocator<Resource> = HandleAllocator::new();
    ///
    /// // Allocate many handles
    /// let handles: Vec<_> = (0..100).map(|_| allocator.allocate()).collect();
    ///
    /// // Deallocate most of them
    /// for h in handles.iter().skip(10) {
    ///     allocator.deallocate(*h);
    /// }
    ///
    /// // Free list now has 90 entries with possibly more capacity
    /// // Shrink to reduce memory
    /// allocator.shrink_to_fit();
    /// ```
    #[inline]
    pub fn shrink_to_fit(&mut self) {
        self.free_list.shrink_to_fit();
    }
}

impl<T> Default for HandleAllocator<T> {
    /// Creates a new, empty handle allocator (same as `new()`).
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for HandleAllocator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let type_name = std::any::type_name::<T>();
        let short_name = type_name.rsplit("::").next().unwrap_or(type_name);

        f.debug_struct(&format!("HandleAllocator<{}>", short_name))
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("free_slots", &self.free_list.len())
            .finish()
    }
}

/// A type-safe, generation-counted handle to an engine resource.
///
/// Handles are lightweight (8 bytes) identifiers that can be safely passed
/// across FFI boundaries. The generic type parameter `T` provides compile-time
/// type safety, ensuring handles for different resource types cannot be mixed.
///
/// # FFI Safety
///
/// The `#[repr(C)]` attribute ensures this struct has a predictable memory
/// layout for interoperability with C#, Python, and other languages:
/// - Offset 0: `index` (4 bytes, u32)
/// - Offset 4: `generation` (4 bytes, u32)
/// - Total size: 8 bytes, alignment: 4 bytes
///
/// The `PhantomData<T>` is a zero-sized type that doesn't affect the layout.
#[repr(C)]
pub struct Handle<T> {
    /// Index into the storage array.
    ///
    /// This is the slot number in the allocator/storage. When a handle is
    /// deallocated, its index may be reused for a new allocation.
    index: u32,

    /// Generation counter for this slot.
    ///
    /// Incremented each time the slot is deallocated. A handle is only valid
    /// if its generation matches the current generation of the slot.
    generation: u32,

    /// Marker to make `Handle<T>` generic over T without storing T.
    ///
    /// This provides compile-time type safety: `Handle<Texture>` and
    /// `Handle<Shader>` are distinct types that cannot be accidentally mixed.
    _marker: PhantomData<T>,
}

impl<T> Handle<T> {
    /// The invalid handle constant.
    ///
    /// Used to represent "no resource" or "null handle". This is distinguishable
    /// from any valid handle because:
    /// - `index` is `u32::MAX`, which exceeds any reasonable allocation count
    /// - `generation` is 0, which is never used for valid allocations
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::Handle;
    ///
    /// struct Texture;
    ///
    /// let handle: Handle<Texture> = Handle::INVALID;
    /// assert!(!handle.is_valid());
    /// assert_eq!(handle.index(), u32::MAX);
    /// assert_eq!(handle.generation(), 0);
    /// ```
    pub const INVALID: Self = Self {
        index: u32::MAX,
        generation: 0,
        _marker: PhantomData,
    };

    /// Creates a new handle with the given index and generation.
    ///
    /// This is typically called by `HandleAllocator`, not by user code.
    /// Users should obtain handles through the allocator or storage APIs.
    ///
    /// # Arguments
    ///
    /// * `index` - The slot index in the storage array
    /// * `generation` - The generation counter for this slot
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::Handle;
    ///
    /// struct Shader;
    ///
    /// let handle: Handle<Shader> = Handle::new(42, 3);
    /// assert_eq!(handle.index(), 42);
    /// assert_eq!(handle.generation(), 3);
    /// ```
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Returns the index component of this handle.
    ///
    /// The index is the slot number in the allocator/storage. It identifies
    /// which entry the handle refers to.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::Handle;
    ///
    /// struct Mesh;
    ///
    /// let handle: Handle<Mesh> = Handle::new(10, 1);
    /// assert_eq!(handle.index(), 10);
    /// ```
    #[inline]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Returns the generation component of this handle.
    ///
    /// The generation is incremented each time a slot is deallocated and
    /// reused. It prevents use-after-free by invalidating old handles.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::Handle;
    ///
    /// struct Audio;
    ///
    /// let handle: Handle<Audio> = Handle::new(5, 7);
    /// assert_eq!(handle.generation(), 7);
    /// ```
    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Checks if this handle is valid (not the INVALID sentinel).
    ///
    /// A handle is considered valid if it is not equal to `Handle::INVALID`.
    /// Note that a "valid" handle here only means it's not the null sentinel;
    /// it may still refer to a deallocated resource (stale handle).
    ///
    /// To check if a handle refers to a live resource, use the allocator's
    /// `is_alive()` method.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::Handle;
    ///
    /// struct Sprite;
    ///
    /// let valid: Handle<Sprite> = Handle::new(0, 1);
    /// assert!(valid.is_valid());
    ///
    /// let invalid: Handle<Sprite> = Handle::INVALID;
    /// assert!(!invalid.is_valid());
    /// ```
    #[inline]
    pub const fn is_valid(&self) -> bool {
        // INVALID has index=u32::MAX and generation=0
        // A handle is invalid if it matches INVALID exactly
        !(self.index == u32::MAX && self.generation == 0)
    }

    /// Packs this handle into a single u64 value.
    ///
    /// The packed format is:
    /// - Upper 32 bits: generation
    /// - Lower 32 bits: index
    ///
    /// This is useful for FFI with languages that prefer a single integer
    /// over a struct, and for use as hash map keys.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::Handle;
    ///
    /// struct Resource;
    ///
    /// let handle: Handle<Resource> = Handle::new(42, 7);
    /// let packed = handle.to_u64();
    /// let unpacked: Handle<Resource> = Handle::from_u64(packed);
    ///
    /// assert_eq!(handle, unpacked);
    /// ```
    #[inline]
    pub const fn to_u64(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Creates a handle from a packed u64 value.
    ///
    /// This is the inverse of `to_u64()`. The packed format is:
    /// - Upper 32 bits: generation
    /// - Lower 32 bits: index
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::Handle;
    ///
    /// struct Resource;
    ///
    /// let packed: u64 = (7u64 << 32) | 42u64;  // gen=7, index=42
    /// let handle: Handle<Resource> = Handle::from_u64(packed);
    ///
    /// assert_eq!(handle.index(), 42);
    /// assert_eq!(handle.generation(), 7);
    /// ```
    #[inline]
    pub const fn from_u64(packed: u64) -> Self {
        let index = packed as u32;
        let generation = (packed >> 32) as u32;
        Self::new(index, generation)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl<T> Clone for Handle<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Get the type name, stripping the module path for readability
        let type_name = std::any::type_name::<T>();
        let short_name = type_name.rsplit("::").next().unwrap_or(type_name);

        write!(
            f,
            "Handle<{}>({}:{})",
            short_name, self.index, self.generation
        )
    }
}

impl<T> PartialEq for Handle<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        // Both index AND generation must match for handles to be equal
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash the packed u64 representation for consistent hashing
        // This ensures hash is consistent with PartialEq
        self.to_u64().hash(state);
    }
}

impl<T> Default for Handle<T> {
    /// Returns `Handle::INVALID`.
    ///
    /// The default handle is the invalid sentinel, representing "no resource".
    /// This is useful for struct initialization where a handle field may not
    /// yet have a valid value.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::Handle;
    ///
    /// struct Texture;
    ///
    /// let handle: Handle<Texture> = Default::default();
    /// assert!(!handle.is_valid());
    /// assert_eq!(handle, Handle::INVALID);
    /// ```
    #[inline]
    fn default() -> Self {
        Self::INVALID
    }
}

impl<T> From<Handle<T>> for u64 {
    /// Converts a handle to its packed u64 representation.
    ///
    /// Format: upper 32 bits = generation, lower 32 bits = index.
    #[inline]
    fn from(handle: Handle<T>) -> u64 {
        handle.to_u64()
    }
}

impl<T> From<u64> for Handle<T> {
    /// Creates a handle from a packed u64 representation.
    ///
    /// Format: upper 32 bits = generation, lower 32 bits = index.
    #[inline]
    fn from(packed: u64) -> Self {
        Handle::from_u64(packed)
    }
}

// =============================================================================
// HandleMap
// =============================================================================

/// A map that associates handles with values using generational indices.
///
/// `HandleMap` is a slot-map data structure that combines a `HandleAllocator`
/// with value storage. It provides:
///
/// - O(1) insertion, returning a new handle
/// - O(1) lookup by handle
/// - O(1) removal by handle
/// - Generational safety: stale handles return None, never wrong values
///
/// This is the primary storage mechanism for engine resources. Each resource
/// type (textures, shaders, entities, etc.) typically has its own `HandleMap`.
///
/// # Type Parameters
///
/// - `T`: Marker type for the handle (provides type safety)
/// - `V`: The value type stored in the map
///
/// # Example
///
/// ```
/// use pica_gl::core::handle::HandleMap;
///
/// // Marker type for textures
/// struct Texture;
///
/// // Value stored for each texture
/// struct TextureData {
///     width: u32,
///     height: u32,
///     path: String,
/// }
///
/// let mut textures: HandleMap<Texture, TextureData> = HandleMap::new();
///
/// // Insert a texture and get a handle
/// let handle = textures.insert(TextureData {
///     width: 1024,
///     height: 768,
///     path: "player.png".to_string(),
/// });
///
/// // Lookup by handle
/// if let Some(tex) = textures.get(handle) {
///     assert_eq!(tex.width, 1024);
/// }
///
/// // Remove by handle
/// let removed = textures.remove(handle);
/// assert!(removed.is_some());
///
/// // Handle is now stale
/// assert!(textures.get(handle).is_none());
/// ```
///
/// # Thread Safety
///
/// `HandleMap` is NOT thread-safe. For concurrent access, wrap in
/// appropriate synchronization primitives (Mutex, RwLock, etc.).
///
/// # Design Pattern: Slot Map
///
/// This is a slot map (or handle-based storage) pattern commonly used in
/// game engines for:
/// - Stable references that survive reallocation
/// - Safe deletion detection without dangling pointers
/// - FFI-safe handles that can be passed across language boundaries
pub struct HandleMap<T, V> {
    /// The handle allocator managing index and generation tracking.
    allocator: HandleAllocator<T>,

    /// Storage for values, indexed by handle index.
    ///
    /// Entries are `Some(value)` for live handles, `None` for deallocated slots.
    /// The index in this vector corresponds to `handle.index()`.
    values: Vec<Option<V>>,
}

impl<T, V> HandleMap<T, V> {
    /// Creates a new, empty handle map.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleMap;
    ///
    /// struct Mesh;
    /// struct MeshData { vertex_count: usize }
    ///
    /// let map: HandleMap<Mesh, MeshData> = HandleMap::new();
    /// assert!(map.is_empty());
    /// assert_eq!(map.len(), 0);
    /// ```
    #[inline]
    pub fn new() -> Self {
        Self {
            allocator: HandleAllocator::new(),
            values: Vec::new(),
        }
    }

    /// Creates a new handle map with pre-allocated capacity.
    ///
    /// This is useful when you know approximately how many entries you'll need,
    /// as it avoids repeated reallocations during bulk insertion.
    ///
    /// # Arguments
    ///
    /// * `capacity` - The number of entries to pre-allocate space for
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleMap;
    ///
    /// struct Entity;
    /// struct EntityData { name: String }
    ///
    /// let map: HandleMap<Entity, EntityData> = HandleMap::with_capacity(1000);
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            allocator: HandleAllocator::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Inserts a value into the map and returns a handle to it.
    ///
    /// The returned handle can be used to retrieve, modify, or remove the value.
    /// The handle remains valid until the value is removed.
    ///
    /// # Arguments
    ///
    /// * `value` - The value to insert
    ///
    /// # Returns
    ///
    /// A handle that can be used to access the inserted value.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleMap;
    ///
    /// struct Shader;
    /// struct ShaderData { name: String }
    ///
    /// let mut map: HandleMap<Shader, ShaderData> = HandleMap::new();
    ///
    /// let h1 = map.insert(ShaderData { name: "basic".to_string() });
    /// let h2 = map.insert(ShaderData { name: "pbr".to_string() });
    ///
    /// assert_ne!(h1, h2);
    /// assert!(h1.is_valid());
    /// assert!(h2.is_valid());
    /// assert_eq!(map.len(), 2);
    /// ```
    pub fn insert(&mut self, value: V) -> Handle<T> {
        let handle = self.allocator.allocate();
        let index = handle.index() as usize;

        // Ensure values vec is large enough
        if index >= self.values.len() {
            self.values.resize_with(index + 1, || None);
        }

        self.values[index] = Some(value);
        handle
    }

    /// Removes a value from the map by its handle.
    ///
    /// If the handle is valid and points to an existing value, the value is
    /// removed and returned. The handle becomes stale after this operation.
    ///
    /// # Arguments
    ///
    /// * `handle` - The handle of the value to remove
    ///
    /// # Returns
    ///
    /// - `Some(value)` if the handle was valid and the value was removed
    /// - `None` if the handle was invalid, stale, or already removed
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleMap;
    ///
    /// struct Audio;
    /// struct AudioClip { duration: f32 }
    ///
    /// let mut map: HandleMap<Audio, AudioClip> = HandleMap::new();
    ///
    /// let handle = map.insert(AudioClip { duration: 5.5 });
    /// assert_eq!(map.len(), 1);
    ///
    /// let removed = map.remove(handle);
    /// assert!(removed.is_some());
    /// assert_eq!(removed.unwrap().duration, 5.5);
    /// assert_eq!(map.len(), 0);
    ///
    /// // Handle is now stale
    /// assert!(map.remove(handle).is_none());
    /// ```
    pub fn remove(&mut self, handle: Handle<T>) -> Option<V> {
        // Check if handle is alive
        if !self.allocator.is_alive(handle) {
            return None;
        }

        let index = handle.index() as usize;

        // Deallocate the handle
        if !self.allocator.deallocate(handle) {
            return None;
        }

        // Take the value from storage
        self.values.get_mut(index).and_then(|slot| slot.take())
    }

    /// Returns a reference to the value associated with a handle.
    ///
    /// # Arguments
    ///
    /// * `handle` - The handle to look up
    ///
    /// # Returns
    ///
    /// - `Some(&V)` if the handle is valid and points to a value
    /// - `None` if the handle is invalid, stale, or the value was removed
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleMap;
    ///
    /// struct Sprite;
    /// struct SpriteData { x: f32, y: f32 }
    ///
    /// let mut map: HandleMap<Sprite, SpriteData> = HandleMap::new();
    ///
    /// let handle = map.insert(SpriteData { x: 100.0, y: 200.0 });
    ///
    /// if let Some(sprite) = map.get(handle) {
    ///     assert_eq!(sprite.x, 100.0);
    ///     assert_eq!(sprite.y, 200.0);
    /// }
    /// ```
    #[inline]
    pub fn get(&self, handle: Handle<T>) -> Option<&V> {
        if !self.allocator.is_alive(handle) {
            return None;
        }

        let index = handle.index() as usize;
        self.values.get(index).and_then(|slot| slot.as_ref())
    }

    /// Returns a mutable reference to the value associated with a handle.
    ///
    /// # Arguments
    ///
    /// * `handle` - The handle to look up
    ///
    /// # Returns
    ///
    /// - `Some(&mut V)` if the handle is valid and points to a value
    /// - `None` if the handle is invalid, stale, or the value was removed
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleMap;
    ///
    /// struct Transform;
    /// struct TransformData { x: f32, y: f32 }
    ///
    /// let mut map: HandleMap<Transform, TransformData> = HandleMap::new();
    ///
    /// let handle = map.insert(TransformData { x: 0.0, y: 0.0 });
    ///
    /// if let Some(transform) = map.get_mut(handle) {
    ///     transform.x = 50.0;
    ///     transform.y = 100.0;
    /// }
    ///
    /// assert_eq!(map.get(handle).unwrap().x, 50.0);
    /// ```
    #[inline]
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut V> {
        if !self.allocator.is_alive(handle) {
            return None;
        }

        let index = handle.index() as usize;
        self.values.get_mut(index).and_then(|slot| slot.as_mut())
    }

    /// Checks if a handle is valid and points to a value in this map.
    ///
    /// This is equivalent to `self.get(handle).is_some()` but more efficient.
    ///
    /// # Arguments
    ///
    /// * `handle` - The handle to check
    ///
    /// # Returns
    ///
    /// `true` if the handle is valid and the value exists, `false` otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleMap;
    ///
    /// struct Entity;
    /// struct EntityData { id: u32 }
    ///
    /// let mut map: HandleMap<Entity, EntityData> = HandleMap::new();
    ///
    /// let handle = map.insert(EntityData { id: 1 });
    /// assert!(map.contains(handle));
    ///
    /// map.remove(handle);
    /// assert!(!map.contains(handle));
    /// ```
    #[inline]
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.allocator.is_alive(handle)
    }

    /// Returns the number of values currently stored in the map.
    ///
    /// This counts only live entries, not removed slots.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleMap;
    ///
    /// struct Resource;
    ///
    /// let mut map: HandleMap<Resource, i32> = HandleMap::new();
    /// assert_eq!(map.len(), 0);
    ///
    /// let h1 = map.insert(10);
    /// let h2 = map.insert(20);
    /// assert_eq!(map.len(), 2);
    ///
    /// map.remove(h1);
    /// assert_eq!(map.len(), 1);
    /// ```
    #[inline]
    pub fn len(&self) -> usize {
        self.allocator.len()
    }

    /// Returns `true` if the map contains no values.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleMap;
    ///
    /// struct Item;
    ///
    /// let mut map: HandleMap<Item, String> = HandleMap::new();
    /// assert!(map.is_empty());
    ///
    /// let handle = map.insert("item".to_string());
    /// assert!(!map.is_empty());
    ///
    /// map.remove(handle);
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.allocator.is_empty()
    }

    /// Returns the total capacity of the map.
    ///
    /// This is the number of slots allocated, including both live and removed entries.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleMap;
    ///
    /// struct Data;
    ///
    /// let mut map: HandleMap<Data, i32> = HandleMap::new();
    /// let h1 = map.insert(1);
    /// let h2 = map.insert(2);
    ///
    /// assert_eq!(map.capacity(), 2);
    ///
    /// map.remove(h1);
    /// // Capacity unchanged after removal
    /// assert_eq!(map.capacity(), 2);
    /// ```
    #[inline]
    pub fn capacity(&self) -> usize {
        self.allocator.capacity()
    }

    /// Clears all values from the map, invalidating all handles.
    ///
    /// After this operation, all previously returned handles become stale.
    /// The capacity is retained but `len()` becomes 0.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleMap;
    ///
    /// struct Object;
    ///
    /// let mut map: HandleMap<Object, i32> = HandleMap::new();
    ///
    /// let h1 = map.insert(100);
    /// let h2 = map.insert(200);
    /// let h3 = map.insert(300);
    ///
    /// map.clear();
    ///
    /// assert!(map.is_empty());
    /// assert!(!map.contains(h1));
    /// assert!(!map.contains(h2));
    /// assert!(!map.contains(h3));
    ///
    /// // Capacity retained
    /// assert_eq!(map.capacity(), 3);
    /// ```
    pub fn clear(&mut self) {
        self.allocator.clear();

        // Clear all values but retain the vec capacity
        for slot in &mut self.values {
            *slot = None;
        }
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// # Arguments
    ///
    /// * `additional` - The number of additional entries to reserve space for
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleMap;
    ///
    /// struct Component;
    ///
    /// let mut map: HandleMap<Component, i32> = HandleMap::new();
    /// map.reserve(100);
    /// ```
    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        self.values.reserve(additional);
    }

    /// Shrinks the capacity of the map as much as possible.
    ///
    /// This reduces memory usage by releasing excess capacity in internal
    /// data structures.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleMap;
    ///
    /// struct Item;
    ///
    /// let mut map: HandleMap<Item, i32> = HandleMap::with_capacity(100);
    ///
    /// for i in 0..10 {
    ///     map.insert(i);
    /// }
    ///
    /// map.shrink_to_fit();
    /// ```
    #[inline]
    pub fn shrink_to_fit(&mut self) {
        self.allocator.shrink_to_fit();
        self.values.shrink_to_fit();
    }
}

impl<T, V> Default for HandleMap<T, V> {
    /// Creates an empty `HandleMap` (same as `new()`).
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T, V: std::fmt::Debug> std::fmt::Debug for HandleMap<T, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let type_name = std::any::type_name::<T>();
        let short_name = type_name.rsplit("::").next().unwrap_or(type_name);

        f.debug_struct(&format!("HandleMap<{}, ...>", short_name))
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

// =============================================================================
// HandleMap Iterators
// =============================================================================

/// An iterator over handle-value pairs in a [`HandleMap`].
///
/// This struct is created by the [`iter`](HandleMap::iter) method on `HandleMap`.
/// It yields `(Handle<T>, &V)` pairs for all live entries.
///
/// # Iteration Order
///
/// Iteration order is based on the internal storage order (by slot index),
/// which corresponds to allocation order for slots that haven't been recycled.
/// Do not rely on any specific ordering as it may change with insertions and removals.
///
/// # Example
///
/// ```
/// use pica_gl::core::handle::HandleMap;
///
/// struct Texture;
///
/// let mut map: HandleMap<Texture, &str> = HandleMap::new();
/// map.insert("first");
/// map.insert("second");
/// map.insert("third");
///
/// for (handle, value) in map.iter() {
///     println!("Handle {:?} => {}", handle, value);
/// }
/// ```
pub struct HandleMapIter<'a, T, V> {
    /// Reference to the allocator for generation checking.
    allocator: &'a HandleAllocator<T>,

    /// Iterator over the values vector with indices.
    values_iter: std::iter::Enumerate<std::slice::Iter<'a, Option<V>>>,
}

impl<'a, T, V> Iterator for HandleMapIter<'a, T, V> {
    type Item = (Handle<T>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        // Iterate through values, skipping None entries
        loop {
            match self.values_iter.next() {
                Some((index, Some(value))) => {
                    // Reconstruct the handle from index and current generation
                    let index = index as u32;
                    // Get the current generation for this slot
                    if let Some(&generation) = self.allocator.generations.get(index as usize) {
                        let handle = Handle::new(index, generation);
                        // Only yield if the handle is alive (matches current generation)
                        if self.allocator.is_alive(handle) {
                            return Some((handle, value));
                        }
                    }
                    // Generation mismatch or out of bounds - skip this entry
                    // This shouldn't happen if the map is consistent, but handle gracefully
                }
                Some((_, None)) => {
                    // Empty slot, continue to next
                    continue;
                }
                None => {
                    // End of iteration
                    return None;
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // Lower bound is 0 (all remaining could be None)
        // Upper bound is remaining elements in the iterator
        let (_, upper) = self.values_iter.size_hint();
        (0, upper)
    }
}

/// A mutable iterator over handle-value pairs in a [`HandleMap`].
///
/// This struct is created by the [`iter_mut`](HandleMap::iter_mut) method on `HandleMap`.
/// It yields `(Handle<T>, &mut V)` pairs for all live entries.
///
/// # Example
///
/// ```
/// use pica_gl::core::handle::HandleMap;
///
/// struct Counter;
///
/// let mut map: HandleMap<Counter, i32> = HandleMap::new();
/// map.insert(1);
/// map.insert(2);
/// map.insert(3);
///
/// for (handle, value) in map.iter_mut() {
///     *value *= 2;
/// }
///
/// // All values are now doubled
/// ```
pub struct HandleMapIterMut<'a, T, V> {
    /// Pointer to the allocator for generation checking.
    /// We use a raw pointer because we can't hold a reference while iterating mutably.
    allocator_ptr: *const HandleAllocator<T>,

    /// Iterator over the values vector with indices.
    values_iter: std::iter::Enumerate<std::slice::IterMut<'a, Option<V>>>,

    /// Phantom marker for lifetime.
    _marker: PhantomData<&'a HandleAllocator<T>>,
}

impl<'a, T, V> Iterator for HandleMapIterMut<'a, T, V> {
    type Item = (Handle<T>, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        // Iterate through values, skipping None entries
        loop {
            match self.values_iter.next() {
                Some((index, Some(value))) => {
                    // Reconstruct the handle from index and current generation
                    let index = index as u32;
                    // Safety: allocator_ptr is valid for the lifetime 'a
                    let allocator = unsafe { &*self.allocator_ptr };
                    if let Some(&generation) = allocator.generations.get(index as usize) {
                        let handle = Handle::new(index, generation);
                        if allocator.is_alive(handle) {
                            return Some((handle, value));
                        }
                    }
                }
                Some((_, None)) => {
                    continue;
                }
                None => {
                    return None;
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (_, upper) = self.values_iter.size_hint();
        (0, upper)
    }
}

/// An iterator over handles in a [`HandleMap`].
///
/// This struct is created by the [`handles`](HandleMap::handles) method on `HandleMap`.
/// It yields `Handle<T>` for all live entries.
///
/// # Example
///
/// ```
/// use pica_gl::core::handle::HandleMap;
///
/// struct Entity;
///
/// let mut map: HandleMap<Entity, String> = HandleMap::new();
/// let h1 = map.insert("entity1".to_string());
/// let h2 = map.insert("entity2".to_string());
///
/// let handles: Vec<_> = map.handles().collect();
/// assert!(handles.contains(&h1));
/// assert!(handles.contains(&h2));
/// ```
pub struct HandleMapHandles<'a, T, V> {
    /// The underlying iterator.
    inner: HandleMapIter<'a, T, V>,
}

impl<'a, T, V> Iterator for HandleMapHandles<'a, T, V> {
    type Item = Handle<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(handle, _)| handle)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An iterator over values in a [`HandleMap`].
///
/// This struct is created by the [`values`](HandleMap::values) method on `HandleMap`.
/// It yields `&V` for all live entries.
///
/// # Example
///
/// ```
/// use pica_gl::core::handle::HandleMap;
///
/// struct Score;
///
/// let mut map: HandleMap<Score, i32> = HandleMap::new();
/// map.insert(100);
/// map.insert(200);
/// map.insert(300);
///
/// let sum: i32 = map.values().sum();
/// assert_eq!(sum, 600);
/// ```
pub struct HandleMapValues<'a, T, V> {
    /// The underlying iterator.
    inner: HandleMapIter<'a, T, V>,
}

impl<'a, T, V> Iterator for HandleMapValues<'a, T, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// A mutable iterator over values in a [`HandleMap`].
///
/// This struct is created by the [`values_mut`](HandleMap::values_mut) method on `HandleMap`.
/// It yields `&mut V` for all live entries.
pub struct HandleMapValuesMut<'a, T, V> {
    /// The underlying iterator.
    inner: HandleMapIterMut<'a, T, V>,
}

impl<'a, T, V> Iterator for HandleMapValuesMut<'a, T, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, V> HandleMap<T, V> {
    /// Returns an iterator over handle-value pairs.
    ///
    /// The iterator yields `(Handle<T>, &V)` for each live entry in the map.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleMap;
    ///
    /// struct Item;
    ///
    /// let mut map: HandleMap<Item, &str> = HandleMap::new();
    /// map.insert("a");
    /// map.insert("b");
    /// map.insert("c");
    ///
    /// let count = map.iter().count();
    /// assert_eq!(count, 3);
    /// ```
    #[inline]
    pub fn iter(&self) -> HandleMapIter<'_, T, V> {
        HandleMapIter {
            allocator: &self.allocator,
            values_iter: self.values.iter().enumerate(),
        }
    }

    /// Returns a mutable iterator over handle-value pairs.
    ///
    /// The iterator yields `(Handle<T>, &mut V)` for each live entry in the map.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleMap;
    ///
    /// struct Counter;
    ///
    /// let mut map: HandleMap<Counter, i32> = HandleMap::new();
    /// map.insert(1);
    /// map.insert(2);
    ///
    /// for (_, value) in map.iter_mut() {
    ///     *value *= 10;
    /// }
    /// ```
    #[inline]
    pub fn iter_mut(&mut self) -> HandleMapIterMut<'_, T, V> {
        HandleMapIterMut {
            allocator_ptr: &self.allocator as *const HandleAllocator<T>,
            values_iter: self.values.iter_mut().enumerate(),
            _marker: PhantomData,
        }
    }

    /// Returns an iterator over handles only.
    ///
    /// This is more efficient than `iter().map(|(h, _)| h)` if you only need handles.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleMap;
    ///
    /// struct Entity;
    ///
    /// let mut map: HandleMap<Entity, ()> = HandleMap::new();
    /// map.insert(());
    /// map.insert(());
    ///
    /// let handles: Vec<_> = map.handles().collect();
    /// assert_eq!(handles.len(), 2);
    /// ```
    #[inline]
    pub fn handles(&self) -> HandleMapHandles<'_, T, V> {
        HandleMapHandles { inner: self.iter() }
    }

    /// Returns an iterator over values only.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleMap;
    ///
    /// struct Score;
    ///
    /// let mut map: HandleMap<Score, i32> = HandleMap::new();
    /// map.insert(10);
    /// map.insert(20);
    /// map.insert(30);
    ///
    /// let total: i32 = map.values().sum();
    /// assert_eq!(total, 60);
    /// ```
    #[inline]
    pub fn values(&self) -> HandleMapValues<'_, T, V> {
        HandleMapValues { inner: self.iter() }
    }

    /// Returns a mutable iterator over values only.
    ///
    /// # Example
    ///
    /// ```
    /// use pica_gl::core::handle::HandleMap;
    ///
    /// struct Data;
    ///
    /// let mut map: HandleMap<Data, i32> = HandleMap::new();
    /// map.insert(1);
    /// map.insert(2);
    ///
    /// for value in map.values_mut() {
    ///     *value += 100;
    /// }
    /// ```
    #[inline]
    pub fn values_mut(&mut self) -> HandleMapValuesMut<'_, T, V> {
        HandleMapValuesMut {
            inner: self.iter_mut(),
        }
    }
}

/// Allows iterating over a `HandleMap` with a for loop.
impl<'a, T, V> IntoIterator for &'a HandleMap<T, V> {
    type Item = (Handle<T>, &'a V);
    type IntoIter = HandleMapIter<'a, T, V>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Allows mutably iterating over a `HandleMap` with a for loop.
impl<'a, T, V> IntoIterator for &'a mut HandleMap<T, V> {
    type Item = (Handle<T>, &'a mut V);
    type IntoIter = HandleMapIterMut<'a, T, V>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
