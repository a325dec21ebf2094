// 该文件是 Linzhi （林芝） 项目的一部分。
// src/state.rs - 运行状态
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::sync::{
  Arc, PoisonError, RwLock,
  atomic::{AtomicBool, AtomicU8, Ordering},
};

use tracing::{debug, info, warn};

use crate::details::ModelInputType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ModelState {
  #[default]
  Initial = 0,
  Running = 1,
  Success = 2,
  Failed = 3,
  NoModelSelected = 4,
  NoDataSelected = 5,
  Cancelled = 6,
}

impl ModelState {
  fn from_u8(value: u8) -> Self {
    match value {
      1 => ModelState::Running,
      2 => ModelState::Success,
      3 => ModelState::Failed,
      4 => ModelState::NoModelSelected,
      5 => ModelState::NoDataSelected,
      6 => ModelState::Cancelled,
      _ => ModelState::Initial,
    }
  }

  pub fn is_running(&self) -> bool {
    *self == ModelState::Running
  }
}

/// 保证同一时间只有一次运行
#[derive(Debug, Default)]
pub struct RunGuard {
  state: AtomicU8,
}

impl RunGuard {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> ModelState {
    ModelState::from_u8(self.state.load(Ordering::Acquire))
  }

  /// 进入 `Running`，已经在运行时返回 `None`
  pub fn try_start(&self) -> Option<RunPermit<'_>> {
    let mut current = self.state.load(Ordering::Acquire);
    loop {
      if current == ModelState::Running as u8 {
        warn!("已有任务正在运行，拒绝新的运行请求");
        return None;
      }
      match self.state.compare_exchange_weak(
        current,
        ModelState::Running as u8,
        Ordering::AcqRel,
        Ordering::Acquire,
      ) {
        Ok(_) => break,
        Err(actual) => current = actual,
      }
    }
    debug!("状态: {:?} -> Running", ModelState::from_u8(current));
    Some(RunPermit {
      guard: self,
      finished: false,
    })
  }

  /// 不进入运行就直接结束，例如没有模型或没有数据，运行中时不做修改
  pub fn reject(&self, state: ModelState) -> bool {
    let mut current = self.state.load(Ordering::Acquire);
    loop {
      if current == ModelState::Running as u8 {
        return false;
      }
      match self.state.compare_exchange_weak(
        current,
        state as u8,
        Ordering::AcqRel,
        Ordering::Acquire,
      ) {
        Ok(_) => return true,
        Err(actual) => current = actual,
      }
    }
  }
}

/// 运行许可，结束时写入最终状态
#[derive(Debug)]
pub struct RunPermit<'a> {
  guard: &'a RunGuard,
  finished: bool,
}

impl RunPermit<'_> {
  pub fn finish(mut self, state: ModelState) -> ModelState {
    self.set(state);
    state
  }

  fn set(&mut self, state: ModelState) {
    info!("状态: Running -> {:?}", state);
    self.guard.state.store(state as u8, Ordering::Release);
    self.finished = true;
  }
}

impl Drop for RunPermit<'_> {
  fn drop(&mut self) {
    if !self.finished {
      warn!("运行未正常结束");
      self.set(ModelState::Failed);
    }
  }
}

/// 当前使用的模型，推理时取一份快照
#[derive(Debug)]
pub struct ActiveModel<M> {
  current: RwLock<Option<Arc<M>>>,
}

impl<M> Default for ActiveModel<M> {
  fn default() -> Self {
    ActiveModel {
      current: RwLock::new(None),
    }
  }
}

impl<M> ActiveModel<M> {
  pub fn new(model: Option<M>) -> Self {
    ActiveModel {
      current: RwLock::new(model.map(Arc::new)),
    }
  }

  pub fn snapshot(&self) -> Option<Arc<M>> {
    self
      .current
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  /// 替换模型，返回旧模型；旧模型在最后一个快照释放后卸载
  pub fn replace(&self, model: M) -> Option<Arc<M>> {
    let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
    current.replace(Arc::new(model))
  }

  pub fn clear(&self) -> Option<Arc<M>> {
    self
      .current
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .take()
  }
}

/// 协作式取消标志
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::Release);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::Acquire)
  }

  pub fn reset(&self) {
    self.0.store(false, Ordering::Release);
  }
}

pub const MESSAGE_NO_DATA: &str = "No data";
pub const MESSAGE_RUNNING: &str = "Inference running";
pub const MESSAGE_SUCCESS: &str = "Inference successful";
pub const MESSAGE_FAILED: &str = "Inference failed";
pub const MESSAGE_NO_MODEL: &str = "Select a model to start inference";
pub const MESSAGE_CANCELLED: &str = "Inference was cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presentation {
  pub progress_visible: bool,
  pub results_visible: bool,
  pub message_visible: bool,
  /// 拍照输入在运行时不能再次触发
  pub trigger_enabled: bool,
  pub run_label: &'static str,
  pub message: &'static str,
}

/// 由状态推导界面显示
pub fn presentation(state: ModelState, input_type: ModelInputType) -> Presentation {
  let running = state.is_running();
  // 视频输入运行时持续刷新结果
  let results_visible =
    state == ModelState::Success || (running && input_type == ModelInputType::Video);
  let message = match state {
    ModelState::Initial | ModelState::NoDataSelected => MESSAGE_NO_DATA,
    ModelState::Running => MESSAGE_RUNNING,
    ModelState::Success => MESSAGE_SUCCESS,
    ModelState::Failed => MESSAGE_FAILED,
    ModelState::NoModelSelected => MESSAGE_NO_MODEL,
    ModelState::Cancelled => MESSAGE_CANCELLED,
  };

  Presentation {
    progress_visible: running,
    results_visible,
    message_visible: !results_visible,
    trigger_enabled: !(running && input_type == ModelInputType::Photo),
    run_label: if running { "Cancel" } else { "Run" },
    message,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_run_guard_rejects_second_start() {
    let guard = RunGuard::new();
    let permit = guard.try_start().unwrap();
    assert!(guard.state().is_running());
    assert!(guard.try_start().is_none());
    assert!(!guard.reject(ModelState::NoDataSelected));
    assert_eq!(permit.finish(ModelState::Success), ModelState::Success);
    assert_eq!(guard.state(), ModelState::Success);
    assert!(guard.try_start().is_some());
  }

  #[test]
  fn test_dropped_permit_fails() {
    let guard = RunGuard::new();
    {
      let _permit = guard.try_start().unwrap();
    }
    assert_eq!(guard.state(), ModelState::Failed);
  }

  #[test]
  fn test_run_guard_is_single_flight_across_threads() {
    let guard = Arc::new(RunGuard::new());
    let barrier = Arc::new(std::sync::Barrier::new(8));
    let handles: Vec<_> = (0..8)
      .map(|_| {
        let guard = guard.clone();
        let barrier = barrier.clone();
        std::thread::spawn(move || {
          barrier.wait();
          match guard.try_start() {
            Some(permit) => {
              std::mem::forget(permit);
              1
            }
            None => 0,
          }
        })
      })
      .collect();
    let started: i32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(started, 1);
  }

  #[test]
  fn test_active_model_snapshot_survives_swap() {
    let active = ActiveModel::new(Some("first".to_string()));
    let snapshot = active.snapshot().unwrap();
    let old = active.replace("second".to_string()).unwrap();
    assert_eq!(*snapshot, "first");
    assert_eq!(*active.snapshot().unwrap(), "second");
    drop(old);
    assert_eq!(Arc::strong_count(&snapshot), 1);
    active.clear();
    assert!(active.snapshot().is_none());
  }

  #[test]
  fn test_cancellation() {
    let cancel = Cancellation::new();
    let other = cancel.clone();
    assert!(!cancel.is_cancelled());
    other.cancel();
    assert!(cancel.is_cancelled());
    cancel.reset();
    assert!(!other.is_cancelled());
  }

  #[test]
  fn test_presentation() {
    let running = presentation(ModelState::Running, ModelInputType::Image);
    assert!(running.progress_visible);
    assert!(!running.results_visible);
    assert_eq!(running.run_label, "Cancel");
    assert_eq!(running.message, MESSAGE_RUNNING);
    assert!(running.trigger_enabled);

    let success = presentation(ModelState::Success, ModelInputType::Image);
    assert!(!success.progress_visible);
    assert!(success.results_visible);
    assert!(!success.message_visible);
    assert_eq!(success.run_label, "Run");

    let video = presentation(ModelState::Running, ModelInputType::Video);
    assert!(video.results_visible);

    let photo = presentation(ModelState::Running, ModelInputType::Photo);
    assert!(!photo.trigger_enabled);

    assert_eq!(
      presentation(ModelState::NoModelSelected, ModelInputType::Image).message,
      MESSAGE_NO_MODEL
    );
    assert_eq!(
      presentation(ModelState::Cancelled, ModelInputType::Image).message,
      MESSAGE_CANCELLED
    );
    assert!(presentation(ModelState::Failed, ModelInputType::Photo).message_visible);
  }
}
