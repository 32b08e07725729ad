//! 订单事件消费者
//!
//! 组合 AmqpConnection（会话与信道）和 OrderProcessor（裁定逻辑），
//! 形成完整的消费管道：声明队列、设置预取上限、逐条处理投递。
//! 循环在独立的后台任务上运行，broker 停摆不会影响控制面。

use analytics_shared::amqp::AmqpConnection;
use analytics_shared::config::AmqpConfig;
use tokio::sync::watch;
use tracing::info;

use crate::error::ConsumeError;
use crate::processor::OrderProcessor;

/// 消费者在 broker 侧注册用的标签
const CONSUMER_TAG: &str = "order-analytics";

/// 订单事件消费者
pub struct OrderConsumer {
    connection: AmqpConnection,
    processor: OrderProcessor,
    config: AmqpConfig,
}

impl OrderConsumer {
    /// 建立到 broker 的连接
    ///
    /// 连接失败（不可达或凭证被拒绝）对消费路径是致命的，
    /// 错误原样上抛给启动方，不做重试。
    pub async fn connect(
        config: &AmqpConfig,
        processor: OrderProcessor,
    ) -> Result<Self, ConsumeError> {
        let connection = AmqpConnection::connect(config).await?;
        Ok(Self {
            connection,
            processor,
            config: config.clone(),
        })
    }

    /// 启动消费循环，直到收到 shutdown 信号或会话失效
    ///
    /// 预取上限必须先于订阅生效：它是唯一的背压手段，
    /// 未确认投递达到上限后 broker 会暂停推送。
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), ConsumeError> {
        let Self {
            connection,
            processor,
            config,
        } = self;

        connection.declare_queue(&config.queue_name).await?;
        connection.set_prefetch(config.prefetch_count).await?;

        let consumer = connection.consume(&config.queue_name, CONSUMER_TAG).await?;

        info!(
            queue = %config.queue_name,
            prefetch = config.prefetch_count,
            "订单事件消费者已启动"
        );

        consumer
            .start(shutdown, |msg| {
                let processor = &processor;
                async move { processor.process(&msg) }
            })
            .await?;

        info!("订单事件消费者已停止");
        Ok(())
    }
}
