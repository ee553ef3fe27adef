//! 网络世界实现
//!
//! 定义网络仿真的世界（World）实现，持有网络拓扑与 TCP 协议栈。

use super::network::Network;
use crate::sim::World;
use std::any::Any;

/// 一个默认的网络世界实现：持有 Network（含 `net.tcp` 协议栈）。
#[derive(Default)]
pub struct NetWorld {
    pub net: Network,
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
