mod min_heap;
pub use min_heap::KeyedMinHeap;
