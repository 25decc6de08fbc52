//! Modbus TCP 适配器
//!
//! 连接 Modbus 从设备，按 request 调用读写寄存器与线圈。
//!
//! ## 调用示例
//!
//! ```json
//! // 读保持寄存器，可选按数据类型解码
//! [{ "function": "read_holding_registers", "address": 100, "count": 2, "dataType": "float32" }]
//! // 写单个寄存器
//! [{ "function": "write_single_register", "address": 10, "value": 42 }]
//! ```
//!
//! 从站 ID 取自凭据 `unitId`（默认 1）。

use crate::adapter::{Connection, ProtocolAdapter};
use crate::error::ProtocolError;
use crate::types::{CapabilitySet, ConnectTarget, ModbusDataType, Operation, ProtocolDescriptor};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use tokio_modbus::prelude::*;
use tracing::debug;

/// Modbus TCP 默认端口
pub const MODBUS_DEFAULT_PORT: u16 = 502;

fn default_register_count() -> u16 {
    1
}

/// Modbus 请求
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "function", rename_all = "snake_case")]
pub enum ModbusRequest {
    /// 读保持寄存器 (0x03)
    ReadHoldingRegisters {
        #[serde(alias = "register_address")]
        address: u16,
        #[serde(default = "default_register_count")]
        count: u16,
        #[serde(default, alias = "dataType")]
        data_type: Option<ModbusDataType>,
    },
    /// 读输入寄存器 (0x04)
    ReadInputRegisters {
        #[serde(alias = "register_address")]
        address: u16,
        #[serde(default = "default_register_count")]
        count: u16,
        #[serde(default, alias = "dataType")]
        data_type: Option<ModbusDataType>,
    },
    /// 读线圈状态 (0x01)
    ReadCoils {
        address: u16,
        #[serde(default = "default_register_count")]
        count: u16,
    },
    /// 读离散输入 (0x02)
    ReadDiscreteInputs {
        address: u16,
        #[serde(default = "default_register_count")]
        count: u16,
    },
    /// 写单个寄存器 (0x06)
    WriteSingleRegister { address: u16, value: u16 },
    /// 写单个线圈 (0x05)
    WriteSingleCoil { address: u16, value: bool },
}

impl ModbusRequest {
    pub fn from_args(args: &[Value]) -> Result<Self, ProtocolError> {
        let value = args
            .first()
            .cloned()
            .ok_or_else(|| ProtocolError::InvalidArgs("modbus request required".to_string()))?;
        serde_json::from_value(value)
            .map_err(|e| ProtocolError::InvalidArgs(format!("modbus request: {}", e)))
    }
}

/// Modbus TCP 适配器
pub struct ModbusTcpAdapter {
    descriptor: ProtocolDescriptor,
}

impl ModbusTcpAdapter {
    pub fn new() -> Self {
        Self {
            descriptor: ProtocolDescriptor {
                id: "modbus".to_string(),
                display_name: "Modbus TCP".to_string(),
                description: "Industrial automation protocol".to_string(),
                default_port: Some(MODBUS_DEFAULT_PORT),
                secure_port: None,
                capabilities: CapabilitySet {
                    disconnect: true,
                    request: true,
                    ..CapabilitySet::default()
                },
            },
        }
    }
}

impl Default for ModbusTcpAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolAdapter for ModbusTcpAdapter {
    fn descriptor(&self) -> &ProtocolDescriptor {
        &self.descriptor
    }

    async fn connect(&self, target: &ConnectTarget) -> Result<Box<dyn Connection>, ProtocolError> {
        let port = target.port.unwrap_or(MODBUS_DEFAULT_PORT);
        let addr: SocketAddr = tokio::net::lookup_host((target.host.as_str(), port))
            .await?
            .next()
            .ok_or_else(|| {
                ProtocolError::Connection(format!("cannot resolve {}:{}", target.host, port))
            })?;
        let unit_id = target
            .credential_u64("unitId")
            .or_else(|| target.credential_u64("unit_id"))
            .unwrap_or(1);
        let unit_id = u8::try_from(unit_id)
            .map_err(|_| ProtocolError::InvalidArgs(format!("invalid unit id: {}", unit_id)))?;

        let ctx = tcp::connect_slave(addr, Slave(unit_id))
            .await
            .map_err(|e| ProtocolError::Connection(e.to_string()))?;
        debug!(%addr, unit_id, "connected to modbus server");
        Ok(Box::new(ModbusConnection { ctx: Some(ctx) }))
    }
}

/// Modbus 连接句柄
pub struct ModbusConnection {
    ctx: Option<tokio_modbus::client::Context>,
}

impl ModbusConnection {
    async fn execute(&mut self, request: ModbusRequest) -> Result<Value, ProtocolError> {
        let ctx = self.ctx.as_mut().ok_or(ProtocolError::ChannelClosed)?;
        let value = match request {
            ModbusRequest::ReadHoldingRegisters {
                address,
                count,
                data_type,
            } => {
                let registers = ctx
                    .read_holding_registers(address, count)
                    .await
                    .map_err(transport_error)?
                    .map_err(exception_error)?;
                registers_to_value(&registers, data_type)?
            }
            ModbusRequest::ReadInputRegisters {
                address,
                count,
                data_type,
            } => {
                let registers = ctx
                    .read_input_registers(address, count)
                    .await
                    .map_err(transport_error)?
                    .map_err(exception_error)?;
                registers_to_value(&registers, data_type)?
            }
            ModbusRequest::ReadCoils { address, count } => {
                let coils = ctx
                    .read_coils(address, count)
                    .await
                    .map_err(transport_error)?
                    .map_err(exception_error)?;
                json!(coils)
            }
            ModbusRequest::ReadDiscreteInputs { address, count } => {
                let inputs = ctx
                    .read_discrete_inputs(address, count)
                    .await
                    .map_err(transport_error)?
                    .map_err(exception_error)?;
                json!(inputs)
            }
            ModbusRequest::WriteSingleRegister { address, value } => {
                ctx.write_single_register(address, value)
                    .await
                    .map_err(transport_error)?
                    .map_err(exception_error)?;
                Value::Null
            }
            ModbusRequest::WriteSingleCoil { address, value } => {
                ctx.write_single_coil(address, value)
                    .await
                    .map_err(transport_error)?
                    .map_err(exception_error)?;
                Value::Null
            }
        };
        Ok(value)
    }
}

#[async_trait]
impl Connection for ModbusConnection {
    async fn invoke(&mut self, operation: Operation, args: Vec<Value>) -> Result<Value, ProtocolError> {
        match operation {
            Operation::Request => {
                let request = ModbusRequest::from_args(&args)?;
                self.execute(request).await
            }
            other => Err(ProtocolError::Unsupported(other.to_string())),
        }
    }

    async fn close(&mut self) -> Result<(), ProtocolError> {
        // 释放 Context 即关闭底层 TCP 连接
        self.ctx.take();
        Ok(())
    }
}

/// 请求未得到应答：连接已不可用
fn transport_error(err: tokio_modbus::Error) -> ProtocolError {
    ProtocolError::Modbus(err.to_string())
}

/// 从站返回异常码：会话仍然可用
fn exception_error(code: ExceptionCode) -> ProtocolError {
    ProtocolError::ModbusException(format!("{:?}", code))
}

/// 寄存器结果：指定数据类型时解码为数值，否则返回原始寄存器数组
fn registers_to_value(
    registers: &[u16],
    data_type: Option<ModbusDataType>,
) -> Result<Value, ProtocolError> {
    match data_type {
        Some(data_type) => Ok(json!(decode_registers(registers, data_type)?)),
        None => Ok(json!(registers)),
    }
}

/// 解析寄存器数据为浮点值（大端字序）
pub fn decode_registers(registers: &[u16], data_type: ModbusDataType) -> Result<f64, ProtocolError> {
    let need = match data_type {
        ModbusDataType::Int16 | ModbusDataType::Uint16 => 1,
        ModbusDataType::Int32 | ModbusDataType::Uint32 | ModbusDataType::Float32 => 2,
        ModbusDataType::Float64 => 4,
    };
    if registers.len() < need {
        return Err(ProtocolError::DataParse(format!(
            "need {} registers for {:?}, got {}",
            need,
            data_type,
            registers.len()
        )));
    }

    let word32 = || ((registers[0] as u32) << 16) | registers[1] as u32;
    let value = match data_type {
        ModbusDataType::Int16 => registers[0] as i16 as f64,
        ModbusDataType::Uint16 => registers[0] as f64,
        ModbusDataType::Int32 => word32() as i32 as f64,
        ModbusDataType::Uint32 => word32() as f64,
        ModbusDataType::Float32 => f32::from_bits(word32()) as f64,
        ModbusDataType::Float64 => {
            let bits = registers[..4]
                .iter()
                .fold(0u64, |acc, word| (acc << 16) | *word as u64);
            f64::from_bits(bits)
        }
    };
    Ok(value)
}
