//! 回収器の一時停止ガード
//!
//! イベントキューが型消去されたポインタでしかペイロードを運べない
//! ホストでは、送信側の参照が消えてから受信側が取り出すまでの間に
//! 自動メモリ回収が走るとペイロードが失われる。このガードはその窓を
//! 覆うための、プロセス全体で共有される参照カウント式の停止機構。
//!
//! このクレート自身のイベントブリッジは値をムーブする型付きチャネル
//! なので配送経路にガードは不要だが、回収器を持つホストへ組み込む際の
//! 契約として `Collector` フックと共に提供する。

use std::sync::Mutex;

/// 停止・再開が可能な回収器のフック
///
/// `suspend` は停止前のしきい値を返し、`restore` はそれを書き戻す。
pub trait Collector {
    type Threshold;

    fn suspend(&self) -> Self::Threshold;
    fn restore(&self, threshold: Self::Threshold);
}

#[derive(Debug)]
struct PauseState<T> {
    count: u32,
    saved_threshold: Option<T>,
}

/// 参照カウント式の一時停止ガード
///
/// 不変条件: 回収器が停止しているのは `count > 0` のときに限る。
/// しきい値は 0→1 の遷移でちょうど1回保存され、1→0 の遷移で
/// ちょうど1回復元される。
pub struct PauseGuard<C: Collector> {
    collector: C,
    state: Mutex<PauseState<C::Threshold>>,
}

impl<C: Collector> PauseGuard<C> {
    pub fn new(collector: C) -> Self {
        Self {
            collector,
            state: Mutex::new(PauseState {
                count: 0,
                saved_threshold: None,
            }),
        }
    }

    /// 回収を停止する
    ///
    /// `resume` が同じ回数呼ばれるまで停止は続く。
    pub fn pause(&self) {
        let mut state = self.state.lock().expect("pause state poisoned");
        if state.count == 0 {
            state.saved_threshold = Some(self.collector.suspend());
        }
        state.count += 1;
    }

    /// `pause` を1回ぶん打ち消す
    ///
    /// カウントが既に0のときは何もしない（二重再開への防波堤）。
    pub fn resume(&self) {
        let mut state = self.state.lock().expect("pause state poisoned");
        if state.count == 0 {
            return;
        }
        state.count -= 1;
        if state.count == 0 {
            if let Some(threshold) = state.saved_threshold.take() {
                self.collector.restore(threshold);
            }
        }
    }

    /// 現在停止中かどうか
    pub fn is_paused(&self) -> bool {
        self.state.lock().expect("pause state poisoned").count > 0
    }

    /// 現在のカウント
    pub fn count(&self) -> u32 {
        self.state.lock().expect("pause state poisoned").count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
    use std::sync::Arc;

    /// テスト用の回収器
    ///
    /// しきい値は整数1つで、停止中は -1 相当として扱う。
    #[derive(Debug, Default)]
    struct TestCollector {
        suspended: AtomicBool,
        threshold: AtomicI32,
    }

    impl TestCollector {
        fn new(threshold: i32) -> Self {
            Self {
                suspended: AtomicBool::new(false),
                threshold: AtomicI32::new(threshold),
            }
        }

        fn is_suspended(&self) -> bool {
            self.suspended.load(Ordering::SeqCst)
        }

        fn current_threshold(&self) -> i32 {
            self.threshold.load(Ordering::SeqCst)
        }
    }

    impl Collector for &TestCollector {
        type Threshold = i32;

        fn suspend(&self) -> i32 {
            self.suspended.store(true, Ordering::SeqCst);
            self.threshold.swap(-1, Ordering::SeqCst)
        }

        fn restore(&self, threshold: i32) {
            self.threshold.store(threshold, Ordering::SeqCst);
            self.suspended.store(false, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_pause_resume_balance() {
        let collector = TestCollector::new(100);
        let guard = PauseGuard::new(&collector);

        assert!(!collector.is_suspended());
        guard.pause();
        assert!(collector.is_suspended());
        assert_eq!(collector.current_threshold(), -1);

        guard.pause();
        guard.resume();
        // 1回分しか打ち消していないので停止は続く
        assert!(collector.is_suspended());

        guard.resume();
        assert!(!collector.is_suspended());
        assert_eq!(collector.current_threshold(), 100);
    }

    #[test]
    fn test_resume_at_zero_is_noop() {
        let collector = TestCollector::new(100);
        let guard = PauseGuard::new(&collector);

        guard.resume();
        guard.resume();
        assert_eq!(guard.count(), 0);
        assert!(!collector.is_suspended());
        assert_eq!(collector.current_threshold(), 100);
    }

    #[test]
    fn test_threshold_saved_once_per_cycle() {
        let collector = TestCollector::new(55);
        let guard = PauseGuard::new(&collector);

        for _ in 0..3 {
            guard.pause();
        }
        for _ in 0..3 {
            guard.resume();
        }
        assert_eq!(collector.current_threshold(), 55);

        // 2巡目でも同じしきい値に戻ること
        guard.pause();
        guard.resume();
        assert_eq!(collector.current_threshold(), 55);
    }

    #[test]
    fn test_suspended_iff_count_positive() {
        let collector = TestCollector::new(10);
        let guard = PauseGuard::new(&collector);

        let ops = [true, true, false, true, false, false, false, true, false];
        for &is_pause in &ops {
            if is_pause {
                guard.pause();
            } else {
                guard.resume();
            }
            assert_eq!(guard.is_paused(), guard.count() > 0);
            assert_eq!(collector.is_suspended(), guard.count() > 0);
        }
    }

    #[test]
    fn test_concurrent_producers() {
        let collector = Arc::new(TestCollector::new(100));
        let guard = Arc::new(PauseGuard::new(SharedCollector(collector.clone())));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let guard = guard.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    guard.pause();
                    guard.resume();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(guard.count(), 0);
        assert!(!collector.is_suspended());
        assert_eq!(collector.current_threshold(), 100);
    }

    /// Arc越しに共有するためのラッパ
    #[derive(Debug)]
    struct SharedCollector(Arc<TestCollector>);

    impl Collector for SharedCollector {
        type Threshold = i32;

        fn suspend(&self) -> i32 {
            self.0.suspended.store(true, Ordering::SeqCst);
            self.0.threshold.swap(-1, Ordering::SeqCst)
        }

        fn restore(&self, threshold: i32) {
            self.0.threshold.store(threshold, Ordering::SeqCst);
            self.0.suspended.store(false, Ordering::SeqCst);
        }
    }
}
