//! AMQP 基础设施封装
//!
//! 将 lapin 的底层 API 封装为业务友好的连接/消费抽象，
//! 统一投递表示、确认语义和优雅关闭，避免各处重复编写样板代码。
//!
//! 确认语义是这里唯一的硬性约束：每条投递的 delivery tag 必须且只能
//! 被消费一次——要么 ack，要么 nack，之后该 tag 即失效。

use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::AmqpConfig;
use crate::error::AnalyticsError;

// ---------------------------------------------------------------------------
// InboundMessage
// ---------------------------------------------------------------------------

/// 消费到的 AMQP 投递的统一表示
///
/// 将 lapin 的 `Delivery` 转换为拥有所有权的结构体，
/// 使消息可以安全地跨 await 点传递给异步处理函数。
/// 确认所需的 acker 不在其中：tag 的归还由消费循环负责。
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub queue: String,
    /// 信道生命周期内唯一的投递标识，仅用于日志关联
    pub delivery_tag: u64,
    /// broker 标记的重投递标志，本服务不参与控制流
    pub redelivered: bool,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    fn from_delivery(queue: &str, delivery: &lapin::message::Delivery) -> Self {
        Self {
            queue: queue.to_string(),
            delivery_tag: delivery.delivery_tag,
            redelivered: delivery.redelivered,
            payload: delivery.data.clone(),
        }
    }

    /// 将负载视为 UTF-8 字符串返回
    pub fn payload_str(&self) -> Result<&str, AnalyticsError> {
        std::str::from_utf8(&self.payload)
            .map_err(|e| AnalyticsError::Internal(format!("负载非 UTF-8 编码: {e}")))
    }

    /// 将 JSON 格式负载反序列化为目标类型
    pub fn deserialize_payload<T: DeserializeOwned>(&self) -> Result<T, AnalyticsError> {
        serde_json::from_slice(&self.payload).map_err(AnalyticsError::from)
    }
}

// ---------------------------------------------------------------------------
// ProcessingOutcome 与确认
// ---------------------------------------------------------------------------

/// 单条投递的处理结果
///
/// 只有两种取值：确认或拒绝，没有"稍后重试"状态。
/// requeue=false 的拒绝表示永久丢弃，防止坏消息无限循环重投。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Acknowledge,
    Reject { requeue: bool },
}

/// 投递确认的抽象
///
/// 单独抽取 trait 是为了让确认逻辑可以脱离真实信道测试，
/// 生产路径上唯一的实现是 lapin 的 `Acker`。
#[async_trait]
pub trait DeliveryAcker: Send + Sync {
    async fn ack(&self) -> Result<(), AnalyticsError>;
    async fn nack(&self, requeue: bool) -> Result<(), AnalyticsError>;
}

#[async_trait]
impl DeliveryAcker for lapin::acker::Acker {
    async fn ack(&self) -> Result<(), AnalyticsError> {
        lapin::acker::Acker::ack(self, BasicAckOptions::default())
            .await
            .map_err(|e| AnalyticsError::Amqp(format!("ack 失败: {e}")))
    }

    async fn nack(&self, requeue: bool) -> Result<(), AnalyticsError> {
        lapin::acker::Acker::nack(
            self,
            BasicNackOptions {
                requeue,
                multiple: false,
            },
        )
        .await
        .map_err(|e| AnalyticsError::Amqp(format!("nack 失败: {e}")))
    }
}

/// 按处理结果归还投递：恰好发出一次终结调用
pub async fn resolve_delivery<A: DeliveryAcker + ?Sized>(
    acker: &A,
    outcome: ProcessingOutcome,
) -> Result<(), AnalyticsError> {
    match outcome {
        ProcessingOutcome::Acknowledge => acker.ack().await,
        ProcessingOutcome::Reject { requeue } => acker.nack(requeue).await,
    }
}

// ---------------------------------------------------------------------------
// AmqpConnection
// ---------------------------------------------------------------------------

/// 持有到 broker 的连接与单个信道
///
/// 连接生命周期与进程一致，正常路径上没有显式关闭操作。
pub struct AmqpConnection {
    _connection: Connection,
    channel: Channel,
}

impl AmqpConnection {
    /// 建立连接并派生一个信道
    ///
    /// broker 不可达或凭证被拒绝时返回错误，由调用方决定是否致命。
    pub async fn connect(config: &AmqpConfig) -> Result<Self, AnalyticsError> {
        let connection = Connection::connect(
            &config.url(),
            ConnectionProperties::default().with_connection_name("order-analytics".into()),
        )
        .await
        .map_err(|e| AnalyticsError::Amqp(format!("连接 broker 失败: {e}")))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| AnalyticsError::Amqp(format!("创建信道失败: {e}")))?;

        info!(host = %config.host, port = config.port, "AMQP 连接已建立");
        Ok(Self {
            _connection: connection,
            channel,
        })
    }

    /// 声明持久化队列
    ///
    /// 同参数重复声明是幂等的；持久化属性不一致时 broker 会报错，
    /// 该错误原样上抛。
    pub async fn declare_queue(&self, name: &str) -> Result<(), AnalyticsError> {
        self.channel
            .queue_declare(
                name,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| AnalyticsError::Amqp(format!("声明队列 {name} 失败: {e}")))?;

        info!(queue = name, "队列已声明");
        Ok(())
    }

    /// 设置信道预取上限，必须在开始消费前调用
    pub async fn set_prefetch(&self, count: u16) -> Result<(), AnalyticsError> {
        self.channel
            .basic_qos(count, BasicQosOptions::default())
            .await
            .map_err(|e| AnalyticsError::Amqp(format!("设置预取上限失败: {e}")))?;

        info!(prefetch = count, "信道预取上限已设置");
        Ok(())
    }

    /// 在指定队列上开始消费
    pub async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<AmqpConsumer, AnalyticsError> {
        let inner = self
            .channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| AnalyticsError::Amqp(format!("订阅队列 {queue} 失败: {e}")))?;

        Ok(AmqpConsumer {
            inner,
            queue: queue.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// AmqpConsumer
// ---------------------------------------------------------------------------

/// 面向业务的 AMQP 消费者
///
/// 基于 `watch` channel 提供关闭语义，确保退出时不会
/// 留下未归还的投递。
pub struct AmqpConsumer {
    inner: lapin::Consumer,
    queue: String,
}

impl AmqpConsumer {
    /// 启动消费循环
    ///
    /// 使用 `tokio::select!` 同时监听投递流和关闭信号：
    /// - 收到投递时调用 handler 决定其去向，然后恰好发出一次 ack 或 nack。
    ///   投递按到达顺序逐条处理，不存在并发处理。
    /// - 关闭信号变为 `true`、或发送端被丢弃时退出循环，
    ///   正在执行的 handler 能自然完成。
    /// - 投递流出错或结束说明会话已失效，循环终止并上抛错误，
    ///   不做重连。
    pub async fn start<F, Fut>(
        mut self,
        mut shutdown: watch::Receiver<bool>,
        handler: F,
    ) -> Result<(), AnalyticsError>
    where
        F: Fn(InboundMessage) -> Fut,
        Fut: std::future::Future<Output = ProcessingOutcome>,
    {
        info!(queue = %self.queue, "AMQP 消费循环已启动");

        loop {
            tokio::select! {
                // 偏向关闭信号，保证收到关闭时能尽快退出
                biased;

                res = shutdown.changed() => {
                    if shutdown_signalled(res, &shutdown) {
                        info!(queue = %self.queue, "收到关闭信号，AMQP 消费循环退出");
                        return Ok(());
                    }
                }

                delivery = self.inner.next() => {
                    let Some(delivery) = delivery else {
                        warn!(queue = %self.queue, "AMQP 投递流已结束");
                        return Err(AnalyticsError::Amqp("投递流已结束".to_string()));
                    };

                    let delivery = delivery.map_err(|e| {
                        error!(error = %e, queue = %self.queue, "接收 AMQP 投递出错");
                        AnalyticsError::Amqp(format!("接收投递失败: {e}"))
                    })?;

                    let msg = InboundMessage::from_delivery(&self.queue, &delivery);
                    debug!(
                        queue = %msg.queue,
                        delivery_tag = msg.delivery_tag,
                        redelivered = msg.redelivered,
                        "收到 AMQP 投递"
                    );

                    let outcome = handler(msg).await;
                    if let Err(e) = resolve_delivery(&delivery.acker, outcome).await {
                        error!(
                            error = %e,
                            delivery_tag = delivery.delivery_tag,
                            "归还投递失败"
                        );
                    }
                }
            }
        }
    }
}

/// 判定关闭信号是否生效
///
/// `changed()` 返回 Err 说明发送端已被丢弃，没有人会再发出关闭信号，
/// 此时继续等待毫无意义且会让 select 空转，因此同样视为关闭。
fn shutdown_signalled(
    changed: Result<(), watch::error::RecvError>,
    shutdown: &watch::Receiver<bool>,
) -> bool {
    changed.is_err() || *shutdown.borrow()
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
