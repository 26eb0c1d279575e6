//! UI 句柄与工厂能力
//!
//! 导航核心只通过 [`UiHandle`] 操作 UI 对象，不关心具体工具包。
//! 适配层负责把原生窗口包装成 `UiHandle`，并以 [`UiFactory`] 的形式注册到路由目录。

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::routing::Params;
use crate::utils::Result;

/// UI 对象的最小能力集
///
/// 适配层返回的错误应使用 [`crate::utils::NavixError::Framework`]，核心会原样透传。
pub trait UiHandle: Send + Sync {
    /// 显示
    fn show(&self) -> Result<()>;

    /// 关闭
    fn close(&self) -> Result<()>;

    /// 是否处于隐藏状态；隐藏的句柄不会被复用
    fn is_hidden(&self) -> bool;

    /// 设置父窗口
    fn set_parent(&self, _parent: &Arc<dyn UiHandle>) -> Result<()> {
        Ok(())
    }

    /// 置于顶层
    fn raise(&self) -> Result<()> {
        Ok(())
    }

    /// 激活窗口
    fn activate_window(&self) -> Result<()> {
        Ok(())
    }
}

impl fmt::Debug for dyn UiHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiHandle")
            .field("hidden", &self.is_hidden())
            .finish()
    }
}

/// 根据参数创建 UI 句柄
pub trait UiFactory: Send + Sync {
    /// 创建实例
    fn create(&self, params: &Params) -> Result<Arc<dyn UiHandle>>;
}

impl<F> UiFactory for F
where
    F: Fn(&Params) -> Result<Arc<dyn UiHandle>> + Send + Sync,
{
    fn create(&self, params: &Params) -> Result<Arc<dyn UiHandle>> {
        self(params)
    }
}

/// 两个句柄是否为同一对象
pub fn same_handle(a: &Arc<dyn UiHandle>, b: &Arc<dyn UiHandle>) -> bool {
    Arc::ptr_eq(a, b)
}

/// 不渲染任何内容的句柄
///
/// 用于预览、命令行和测试：记录 show / close / raise 调用以及创建参数。
#[derive(Debug, Default)]
pub struct HeadlessHandle {
    title: String,
    params: Params,
    hidden: AtomicBool,
    closed: AtomicBool,
    raised: AtomicUsize,
    parented: AtomicBool,
}

impl HeadlessHandle {
    /// 以标题与创建参数构造；初始为隐藏状态
    pub fn new(title: impl Into<String>, params: Params) -> Self {
        Self {
            title: title.into(),
            params,
            hidden: AtomicBool::new(true),
            ..Default::default()
        }
    }

    /// 返回一个为每次调用创建新 `HeadlessHandle` 的工厂
    pub fn factory(title: impl Into<String>) -> impl UiFactory + 'static {
        let title = title.into();
        move |params: &Params| -> Result<Arc<dyn UiHandle>> {
            Ok(Arc::new(HeadlessHandle::new(title.clone(), params.clone())))
        }
    }

    /// 标题
    pub fn title(&self) -> &str {
        &self.title
    }

    /// 创建时收到的参数
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// 是否已关闭
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// `raise` 被调用的次数
    pub fn raise_count(&self) -> usize {
        self.raised.load(Ordering::SeqCst)
    }

    /// 是否设置过父窗口
    pub fn has_parent(&self) -> bool {
        self.parented.load(Ordering::SeqCst)
    }
}

impl UiHandle for HeadlessHandle {
    fn show(&self) -> Result<()> {
        self.hidden.store(false, Ordering::SeqCst);
        self.closed.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.hidden.store(true, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }

    fn set_parent(&self, _parent: &Arc<dyn UiHandle>) -> Result<()> {
        self.parented.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn raise(&self) -> Result<()> {
        self.raised.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
