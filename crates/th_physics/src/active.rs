// crates/th_physics/src/active.rs

//! 活跃单元集合
//!
//! 求解器只扫掠活跃单元：水深超过干湿阈值的单元及其 4-邻居晕圈
//! （晕圈保证湿润锋能向外推进）。集合由两部分表示：
//! - 稠密位图：O(1) 成员判定
//! - 有序索引列表：O(活跃数) 迭代
//!
//! 下一步集合写入备用缓冲，步末整体交换，避免在迭代中修改集合。
//! 每步结束后位图与列表保持一致，两套列表均保持升序。

use th_terrain::TerrainGrid;

/// 活跃单元集合（双缓冲）
#[derive(Debug, Clone)]
pub struct ActiveSet {
    /// 当前步位图
    flags: Vec<bool>,
    /// 当前步索引列表（升序）
    cells: Vec<usize>,
    /// 下一步位图
    next_flags: Vec<bool>,
    /// 下一步索引列表（finish 时排序）
    next_cells: Vec<usize>,
}

impl ActiveSet {
    /// 创建空集合
    pub fn new(n_cells: usize) -> Self {
        Self {
            flags: vec![false; n_cells],
            cells: Vec::new(),
            next_flags: vec![false; n_cells],
            next_cells: Vec::new(),
        }
    }

    /// 清空两套缓冲
    pub fn clear(&mut self) {
        for &k in &self.cells {
            self.flags[k] = false;
        }
        self.cells.clear();
        for &k in &self.next_cells {
            self.next_flags[k] = false;
        }
        self.next_cells.clear();
    }

    /// 成员判定（当前步）
    #[inline]
    pub fn contains(&self, k: usize) -> bool {
        self.flags[k]
    }

    /// 当前步索引列表
    #[inline]
    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    /// 活跃单元数
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// 将单元加入当前步集合（不保持有序，须随后调用 [`Self::commit`]）
    #[inline]
    pub fn activate(&mut self, k: usize) {
        if !self.flags[k] {
            self.flags[k] = true;
            self.cells.push(k);
        }
    }

    /// 批量激活后恢复升序
    pub fn commit(&mut self) {
        self.cells.sort_unstable();
    }

    /// 将单元标记进下一步集合
    #[inline]
    fn mark_next(&mut self, k: usize) {
        if !self.next_flags[k] {
            self.next_flags[k] = true;
            self.next_cells.push(k);
        }
    }

    /// 活跃集维护：湿润单元连同邻居进入下一步，干燥单元水深清零
    ///
    /// 对当前集合中每个单元：
    /// - `h[k] > min_depth`：单元及其 4 个非无数据邻居标记进下一步
    /// - 否则：`h[k]` 钳制为 0，除非被某个湿润邻居保留，单元离开集合
    ///
    /// 随后排序下一步列表并交换缓冲。入参取网格的拆分借用
    /// （[`TerrainGrid::split_mut`]），以便在读拓扑的同时写水深。
    pub fn retire_and_propagate(
        &mut self,
        neighbors: &[[i32; 4]],
        z: &[f64],
        h: &mut [f64],
        min_depth: f64,
    ) {
        for idx in 0..self.cells.len() {
            let k = self.cells[idx];
            if h[k] > min_depth {
                self.mark_next(k);
                for &nb in &neighbors[k] {
                    if nb >= 0 && !TerrainGrid::is_nodata_value(z[nb as usize]) {
                        self.mark_next(nb as usize);
                    }
                }
            } else {
                h[k] = 0.0;
            }
        }
        self.finish_step();
    }

    /// 排序下一步列表并交换缓冲
    fn finish_step(&mut self) {
        for &k in &self.cells {
            self.flags[k] = false;
        }
        self.cells.clear();
        self.next_cells.sort_unstable();
        std::mem::swap(&mut self.flags, &mut self.next_flags);
        std::mem::swap(&mut self.cells, &mut self.next_cells);
    }
}

// ============================================================
// 测试
// ============================================================
