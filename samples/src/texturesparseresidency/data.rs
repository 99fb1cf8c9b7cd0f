
use ash::vk;
use rand::Rng;
use rand::seq::SliceRandom;

use vkbase::{vkuint, vkbytes};
use vkbase::{Mat4F, VkResult, VkError};

pub const TEXTURE_DIM: vkuint = 8192;
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;
/// number of pages sharing one device memory allocation.
pub const PAGES_PER_BLOCK: usize = 64;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct UboVS {
    pub projection: Mat4F,
    pub model: Mat4F,
    pub view_pos: [f32; 4],
    pub lod_bias: f32,
    _padding: [f32; 3],
}

impl UboVS {

    pub fn new(projection: Mat4F, model: Mat4F, view_pos: [f32; 4], lod_bias: f32) -> UboVS {
        UboVS { projection, model, view_pos, lod_bias, _padding: [0.0; 3] }
    }
}


/// A piece of memory where one page can be bound.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct PageSlot {
    pub memory: vk::DeviceMemory,
    pub offset: vkbytes,
    block: usize,
    index: usize,
}

/// Sub-allocates page sized slots from a few big memory blocks.
///
/// A block is allocated when every existing slot is in use, freed slots are reused before that.
pub struct PagePool {
    page_size: vkbytes,
    blocks: Vec<vk::DeviceMemory>,
    free_slots: Vec<(usize, usize)>,
}

impl PagePool {

    pub fn new(page_size: vkbytes) -> PagePool {
        PagePool { page_size, blocks: Vec::new(), free_slots: Vec::new() }
    }

    pub fn block_size(&self) -> vkbytes {
        self.page_size * PAGES_PER_BLOCK as vkbytes
    }

    /// Take a free slot, calling `allocate_block` for a new block of `block_size()` bytes if none is left.
    pub fn acquire(&mut self, allocate_block: impl FnOnce(vkbytes) -> VkResult<vk::DeviceMemory>) -> VkResult<PageSlot> {

        if self.free_slots.is_empty() {
            let memory = allocate_block(self.block_size())?;
            let block = self.blocks.len();
            self.blocks.push(memory);
            // reversed, so that slots are handed out from the start of block.
            self.free_slots.extend((0..PAGES_PER_BLOCK).rev().map(|index| (block, index)));
        }

        let (block, index) = self.free_slots.pop()
            .ok_or(VkError::other("Sparse page pool is exhausted."))?;

        let slot = PageSlot {
            memory: self.blocks[block],
            offset: self.page_size * index as vkbytes,
            block, index,
        };
        Ok(slot)
    }

    /// Take `count` slots at once. If a block allocation fails, the slots taken so far are released.
    pub fn acquire_many(&mut self, count: usize, mut allocate_block: impl FnMut(vkbytes) -> VkResult<vk::DeviceMemory>) -> VkResult<Vec<PageSlot>> {

        let mut slots = Vec::with_capacity(count);
        for _ in 0..count {
            match self.acquire(&mut allocate_block) {
                | Ok(slot) => slots.push(slot),
                | Err(e) => {
                    for slot in slots.drain(..) {
                        self.release(slot);
                    }
                    return Err(e)
                },
            }
        }
        Ok(slots)
    }

    pub fn release(&mut self, slot: PageSlot) {
        debug_assert!(!self.free_slots.contains(&(slot.block, slot.index)));
        self.free_slots.push((slot.block, slot.index));
    }

    pub fn used_slots(&self) -> usize {
        self.blocks.len() * PAGES_PER_BLOCK - self.free_slots.len()
    }

    /// Hand out all blocks for destruction. Every slot is considered free afterwards.
    pub fn drain_blocks(&mut self) -> Vec<vk::DeviceMemory> {
        self.free_slots.clear();
        std::mem::take(&mut self.blocks)
    }
}


/// A sparse block of the virtual texture, bound to device memory on demand.
#[derive(Debug, Clone)]
pub struct VirtualTexturePage {
    pub offset: vk::Offset3D,
    pub extent: vk::Extent3D,
    pub mip_level: vkuint,
    pub layer: vkuint,
    pub index: usize,
    /// the backing memory, `None` if the page is not resident.
    pub memory: Option<PageSlot>,
}

impl VirtualTexturePage {

    pub fn is_resident(&self) -> bool {
        self.memory.is_some()
    }

    pub fn texel_count(&self) -> usize {
        (self.extent.width * self.extent.height * self.extent.depth) as usize
    }

    /// The bind of this page. A non-resident page binds null memory, which releases its previous binding.
    pub fn image_bind(&self) -> vk::SparseImageMemoryBind {

        let (memory, memory_offset) = match self.memory {
            | Some(slot) => (slot.memory, slot.offset),
            | None => (vk::DeviceMemory::null(), 0),
        };

        vk::SparseImageMemoryBind {
            subresource: vk::ImageSubresource {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: self.mip_level,
                array_layer: self.layer,
            },
            offset: self.offset,
            extent: self.extent,
            memory, memory_offset,
            flags: vk::SparseMemoryBindFlags::empty(),
        }
    }

    pub fn copy_region(&self, buffer_offset: vkbytes) -> vk::BufferImageCopy {

        vk::BufferImageCopy {
            buffer_offset,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: self.mip_level,
                base_array_layer: self.layer,
                layer_count: 1,
            },
            image_offset: self.offset,
            image_extent: self.extent,
        }
    }
}


/// The mip levels that are too small to be split into pages, bound as a whole via opaque binds.
#[derive(Debug, Clone)]
pub struct MipTailInfo {
    /// if set, all layers share one mip tail.
    pub is_single: bool,
    pub first_lod: vkuint,
    pub size: vkbytes,
    pub offset: vkbytes,
    pub stride: vkbytes,
    pub memory: Vec<vk::DeviceMemory>,
}

impl MipTailInfo {

    pub fn from_requirements(requirements: &vk::SparseImageMemoryRequirements) -> MipTailInfo {

        MipTailInfo {
            is_single: requirements.format_properties.flags.contains(vk::SparseImageFormatFlags::SINGLE_MIPTAIL),
            first_lod: requirements.image_mip_tail_first_lod,
            size  : requirements.image_mip_tail_size,
            offset: requirements.image_mip_tail_offset,
            stride: requirements.image_mip_tail_stride,
            memory: Vec::new(),
        }
    }

    pub fn is_resident(&self) -> bool {
        !self.memory.is_empty()
    }

    /// Number of separate mip tail regions to bind.
    pub fn region_count(&self, layers: vkuint) -> usize {
        if self.is_single { 1 } else { layers as usize }
    }

    pub fn opaque_binds(&self) -> Vec<vk::SparseMemoryBind> {

        self.memory.iter().enumerate().map(|(layer, &memory)| {
            vk::SparseMemoryBind {
                resource_offset: self.offset + self.stride * layer as vkbytes,
                size: self.size,
                memory,
                memory_offset: 0,
                flags: vk::SparseMemoryBindFlags::empty(),
            }
        }).collect()
    }
}


/// The page grid of one mip level.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct MipPageGrid {
    pub mip_level: vkuint,
    pub extent: vk::Extent3D,
    pub pages_x: vkuint,
    pub pages_y: vkuint,
    pub pages_z: vkuint,
}

/// How the non-tail mip levels of a sparse image are divided into pages of the image granularity.
#[derive(Debug, Clone)]
pub struct SparsePageLayout {
    pub granularity: vk::Extent3D,
    pub grids: Vec<MipPageGrid>,
    pub layers: vkuint,
}

impl SparsePageLayout {

    pub fn compute(extent: vk::Extent3D, layers: vkuint, granularity: vk::Extent3D, mip_tail_first_lod: vkuint) -> SparsePageLayout {

        let grids = (0..mip_tail_first_lod).map(|mip_level| {

            let mip_extent = vk::Extent3D {
                width : (extent.width  >> mip_level).max(1),
                height: (extent.height >> mip_level).max(1),
                depth : (extent.depth  >> mip_level).max(1),
            };

            MipPageGrid {
                mip_level,
                extent: mip_extent,
                pages_x: div_ceil(mip_extent.width,  granularity.width),
                pages_y: div_ceil(mip_extent.height, granularity.height),
                pages_z: div_ceil(mip_extent.depth,  granularity.depth),
            }
        }).collect();

        SparsePageLayout { granularity, grids, layers }
    }

    pub fn page_count(&self) -> usize {
        let per_layer: vkuint = self.grids.iter().map(|g| g.pages_x * g.pages_y * g.pages_z).sum();
        (per_layer * self.layers) as usize
    }

    /// Every page of every layer, the pages at the right and bottom border may be smaller than the granularity.
    pub fn pages(&self) -> Vec<VirtualTexturePage> {

        let mut pages = Vec::with_capacity(self.page_count());

        for layer in 0..self.layers {
            for grid in self.grids.iter() {
                for z in 0..grid.pages_z {
                    for y in 0..grid.pages_y {
                        for x in 0..grid.pages_x {

                            let offset = vk::Offset3D {
                                x: (x * self.granularity.width)  as i32,
                                y: (y * self.granularity.height) as i32,
                                z: (z * self.granularity.depth)  as i32,
                            };
                            let extent = vk::Extent3D {
                                width : self.granularity.width.min(grid.extent.width  - offset.x as vkuint),
                                height: self.granularity.height.min(grid.extent.height - offset.y as vkuint),
                                depth : self.granularity.depth.min(grid.extent.depth  - offset.z as vkuint),
                            };

                            pages.push(VirtualTexturePage {
                                offset, extent,
                                mip_level: grid.mip_level,
                                layer,
                                index: pages.len(),
                                memory: None,
                            });
                        }
                    }
                }
            }
        }

        pages
    }
}

fn div_ceil(value: vkuint, divisor: vkuint) -> vkuint {
    (value + divisor - 1) / divisor
}


/// Sparse binds collected from the current residency state of a virtual texture.
#[derive(Debug, Default)]
pub struct SparseBindBatch {
    pub image_binds: Vec<vk::SparseImageMemoryBind>,
    pub opaque_binds: Vec<vk::SparseMemoryBind>,
}

impl SparseBindBatch {

    pub fn is_empty(&self) -> bool {
        self.image_binds.is_empty() && self.opaque_binds.is_empty()
    }
}

/// Residency bookkeeping of a sparse image.
pub struct VirtualTexture {
    pub pages: Vec<VirtualTexturePage>,
    pub mip_tail: MipTailInfo,
    pub layout: SparsePageLayout,
    /// pages whose binding changed since last `update_sparse_bind_info`.
    dirty_pages: Vec<usize>,
    is_tail_dirty: bool,
}

impl VirtualTexture {

    pub fn new(layout: SparsePageLayout, mip_tail: MipTailInfo) -> VirtualTexture {

        let pages = layout.pages();
        VirtualTexture { pages, mip_tail, layout, dirty_pages: Vec::new(), is_tail_dirty: false }
    }

    pub fn resident_count(&self) -> usize {
        self.pages.iter().filter(|p| p.is_resident()).count()
    }

    /// Pick about half of the pages that are not resident yet.
    pub fn select_pages_to_fill(&self, rng: &mut impl Rng) -> Vec<usize> {
        self.pick_half(rng, false)
    }

    /// Pick about half of the resident pages.
    pub fn select_pages_to_flush(&self, rng: &mut impl Rng) -> Vec<usize> {
        self.pick_half(rng, true)
    }

    fn pick_half(&self, rng: &mut impl Rng, is_resident: bool) -> Vec<usize> {

        let mut candidates: Vec<usize> = self.pages.iter()
            .filter(|p| p.is_resident() == is_resident)
            .map(|p| p.index)
            .collect();
        candidates.shuffle(rng);
        candidates.truncate((candidates.len() + 1) / 2);
        candidates.sort_unstable();
        candidates
    }

    pub fn bind_page(&mut self, index: usize, slot: PageSlot) {
        debug_assert!(!self.pages[index].is_resident());
        self.pages[index].memory = Some(slot);
        self.dirty_pages.push(index);
    }

    /// Bind a slot of `pool` to each page of `indices`.
    ///
    /// Either every page becomes resident or, when the pool fails to grow, none of them does.
    pub fn fill_pages(&mut self, indices: &[usize], pool: &mut PagePool, allocate_block: impl FnMut(vkbytes) -> VkResult<vk::DeviceMemory>) -> VkResult<()> {

        let slots = pool.acquire_many(indices.len(), allocate_block)?;
        for (&index, slot) in indices.iter().zip(slots) {
            self.bind_page(index, slot);
        }
        Ok(())
    }

    /// Back the mip tail with `memory`, one allocation per tail region.
    pub fn bind_mip_tail(&mut self, memory: Vec<vk::DeviceMemory>) {
        debug_assert!(!self.mip_tail.is_resident());
        self.mip_tail.memory = memory;
        self.is_tail_dirty = true;
    }

    /// Mark the page as non-resident and return its memory slot.
    pub fn release_page(&mut self, index: usize) -> Option<PageSlot> {

        let slot = self.pages[index].memory.take();
        if slot.is_some() {
            self.dirty_pages.push(index);
        }
        slot
    }

    /// Collect the binds of the pages changed since last call, plus the mip tail binds if the tail was bound since.
    pub fn update_sparse_bind_info(&mut self) -> SparseBindBatch {

        let mut dirty = std::mem::take(&mut self.dirty_pages);
        dirty.sort_unstable();
        dirty.dedup();

        SparseBindBatch {
            image_binds: dirty.into_iter().map(|i| self.pages[i].image_bind()).collect(),
            opaque_binds: if std::mem::replace(&mut self.is_tail_dirty, false) {
                self.mip_tail.opaque_binds()
            } else {
                Vec::new()
            },
        }
    }
}

/// A random opaque color to fill a page with.
pub fn random_page_color(rng: &mut impl Rng) -> [u8; 4] {
    [rng.gen_range(32..=255), rng.gen_range(32..=255), rng.gen_range(32..=255), 255]
}

/// Marker color of each mip tail level, so that the transition to the tail is visible.
pub fn mip_tail_color(level: vkuint) -> [u8; 4] {

    const COLORS: [[u8; 4]; 4] = [
        [255, 255, 255, 255],
        [200, 200, 200, 255],
        [150, 150, 150, 255],
        [100, 100, 100, 255],
    ];
    COLORS[level as usize % COLORS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn granularity() -> vk::Extent3D {
        vk::Extent3D { width: 128, height: 128, depth: 1 }
    }

    fn test_texture() -> VirtualTexture {

        let extent = vk::Extent3D { width: 1000, height: 600, depth: 1 };
        let layout = SparsePageLayout::compute(extent, 1, granularity(), 3);
        let mip_tail = MipTailInfo {
            is_single: false, first_lod: 3, size: 65536, offset: 1 << 24, stride: 0,
            memory: Vec::new(),
        };
        VirtualTexture::new(layout, mip_tail)
    }

    fn fake_slot(i: usize) -> PageSlot {
        PageSlot { memory: vk::DeviceMemory::from_raw(1), offset: 0, block: 0, index: i }
    }

    #[test]
    fn pages_cover_each_mip_exactly_once() {

        let extent = vk::Extent3D { width: 1000, height: 600, depth: 1 };
        let layout = SparsePageLayout::compute(extent, 1, granularity(), 4);
        let pages = layout.pages();
        assert_eq!(pages.len(), layout.page_count());

        for grid in layout.grids.iter() {

            let mut covered = vec![0_u8; (grid.extent.width * grid.extent.height) as usize];
            for page in pages.iter().filter(|p| p.mip_level == grid.mip_level) {
                for y in 0..page.extent.height {
                    for x in 0..page.extent.width {
                        let px = page.offset.x as u32 + x;
                        let py = page.offset.y as u32 + y;
                        covered[(py * grid.extent.width + px) as usize] += 1;
                    }
                }
            }
            assert!(covered.iter().all(|&c| c == 1), "mip {} is not covered exactly once", grid.mip_level);
        }
    }

    #[test]
    fn edge_pages_are_clipped() {

        let extent = vk::Extent3D { width: 1000, height: 600, depth: 1 };
        let layout = SparsePageLayout::compute(extent, 1, granularity(), 1);
        assert_eq!((layout.grids[0].pages_x, layout.grids[0].pages_y), (8, 5));

        let pages = layout.pages();
        let corner = pages.last().unwrap();
        assert_eq!(corner.extent.width, 1000 - 7 * 128);
        assert_eq!(corner.extent.height, 600 - 4 * 128);
    }

    #[test]
    fn page_indices_match_positions() {
        let texture = test_texture();
        assert!(texture.pages.iter().enumerate().all(|(i, p)| p.index == i));
    }

    #[test]
    fn random_fill_never_picks_resident_pages() {

        let mut rng = StdRng::seed_from_u64(7);
        let mut texture = test_texture();

        for round in 0..4 {
            let selected = texture.select_pages_to_fill(&mut rng);
            assert!(!selected.is_empty() || texture.resident_count() == texture.pages.len());
            for index in selected {
                assert!(!texture.pages[index].is_resident(), "round {} picked bound page {}", round, index);
                texture.bind_page(index, fake_slot(index));
            }
        }
        assert!(texture.resident_count() > texture.pages.len() / 2);
    }

    #[test]
    fn flush_only_releases_bound_pages() {

        let mut rng = StdRng::seed_from_u64(11);
        let mut texture = test_texture();

        for index in texture.select_pages_to_fill(&mut rng) {
            texture.bind_page(index, fake_slot(index));
        }
        let resident_before = texture.resident_count();
        texture.update_sparse_bind_info();

        let flushed = texture.select_pages_to_flush(&mut rng);
        assert_eq!(flushed.len(), (resident_before + 1) / 2);
        for index in flushed.iter() {
            assert!(texture.release_page(*index).is_some());
        }
        assert_eq!(texture.resident_count(), resident_before - flushed.len());

        // the binds unbind exactly the flushed pages.
        let batch = texture.update_sparse_bind_info();
        assert_eq!(batch.image_binds.len(), flushed.len());
        assert!(batch.image_binds.iter().all(|b| b.memory == vk::DeviceMemory::null()));
    }

    #[test]
    fn bind_info_contains_only_changed_pages() {

        let mut texture = test_texture();
        texture.bind_page(2, fake_slot(2));
        texture.bind_page(5, fake_slot(5));

        let batch = texture.update_sparse_bind_info();
        assert_eq!(batch.image_binds.len(), 2);
        assert!(batch.opaque_binds.is_empty());

        assert!(texture.update_sparse_bind_info().is_empty());
    }

    #[test]
    fn mip_tail_binds_one_region_per_layer() {

        let mut tail = test_texture().mip_tail;
        tail.stride = 1 << 20;
        tail.memory = vec![vk::DeviceMemory::from_raw(3), vk::DeviceMemory::from_raw(4)];

        let binds = tail.opaque_binds();
        assert_eq!(binds.len(), 2);
        assert_eq!(binds[1].resource_offset, tail.offset + tail.stride);
        assert_eq!(tail.region_count(2), 2);
    }

    #[test]
    fn failed_fill_leaves_pages_unbound() {

        let mut texture = test_texture();
        let mut pool = PagePool::new(65536);

        // one slot of the first block is left, the next block runs out of device memory.
        let occupied = pool.acquire_many(PAGES_PER_BLOCK - 1, |_size| Ok(vk::DeviceMemory::from_raw(1))).unwrap();
        let out_of_memory = |_size: vkbytes| -> VkResult<vk::DeviceMemory> { Err(VkError::device("Allocate Memory")) };

        let result = texture.fill_pages(&[0, 1, 2], &mut pool, out_of_memory);
        assert!(result.is_err());
        assert_eq!(texture.resident_count(), 0);
        assert_eq!(pool.used_slots(), occupied.len());
        assert!(texture.update_sparse_bind_info().is_empty());

        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(texture.select_pages_to_fill(&mut rng).len(), (texture.pages.len() + 1) / 2);

        // the slot handed back by the failed fill is still usable.
        texture.fill_pages(&[0], &mut pool, out_of_memory).unwrap();
        assert_eq!(texture.resident_count(), 1);
        assert_eq!(pool.used_slots(), PAGES_PER_BLOCK);
    }

    #[test]
    fn mip_tail_is_bound_once() {

        let mut texture = test_texture();
        texture.bind_mip_tail(vec![vk::DeviceMemory::from_raw(9)]);
        texture.bind_page(1, fake_slot(1));

        let batch = texture.update_sparse_bind_info();
        assert_eq!(batch.opaque_binds.len(), 1);
        assert_eq!(batch.opaque_binds[0].memory, vk::DeviceMemory::from_raw(9));

        // later page updates do not rebind the tail.
        texture.release_page(1);
        let batch = texture.update_sparse_bind_info();
        assert_eq!(batch.image_binds.len(), 1);
        assert!(batch.opaque_binds.is_empty());
    }

    #[test]
    fn page_pool_reuses_released_slots() {

        let mut pool = PagePool::new(65536);
        let mut allocated = 0;
        let mut allocate = |_size: vkbytes| {
            allocated += 1;
            Ok(vk::DeviceMemory::from_raw(allocated))
        };

        let mut slots = Vec::new();
        for _ in 0..(PAGES_PER_BLOCK + 1) {
            slots.push(pool.acquire(&mut allocate).unwrap());
        }
        assert_eq!(pool.used_slots(), PAGES_PER_BLOCK + 1);
        assert_eq!(slots[1].offset, 65536);
        assert_ne!(slots[0].memory, slots[PAGES_PER_BLOCK].memory);

        let released = slots.pop().unwrap();
        pool.release(released);
        let reused = pool.acquire(&mut allocate).unwrap();
        assert_eq!(reused, released);
        assert_eq!(pool.drain_blocks().len(), 2);
    }
}
