//! 响应构造与 DTO 转换
//!
//! 领域错误在此统一映射为 HTTP 状态码与稳定的错误码。

use api_contract::{
    ApiError, ApiResponse, DeviceDto, DeviceSummaryDto, DiscoveryResultDto, PortProfileDto,
    ProtocolDto,
};
use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use domain::{Device, DeviceSummary, DiscoveryResult};
use iot_device::DeviceError;
use iot_discovery::{DiscoveryError, PortProfile};
use iot_protocol::ProtocolDescriptor;
use tracing::{error, warn};

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::error(code, message))).into_response()
}

/// 400 INVALID.REQUEST
pub fn bad_request_error(message: impl Into<String>) -> Response {
    error_response(StatusCode::BAD_REQUEST, "INVALID.REQUEST", message)
}

/// 设备错误到 HTTP 响应的映射
pub fn device_error(err: DeviceError) -> Response {
    let (status, code) = match &err {
        DeviceError::DeviceNotFound(_) => (StatusCode::NOT_FOUND, "DEVICE.NOT_FOUND"),
        DeviceError::UnknownProtocol { .. } => {
            (StatusCode::BAD_REQUEST, "DEVICE.UNKNOWN_PROTOCOL")
        }
        DeviceError::ProtocolNotSupported { .. } => {
            (StatusCode::BAD_REQUEST, "DEVICE.PROTOCOL_NOT_SUPPORTED")
        }
        DeviceError::OperationNotSupported { .. } => {
            (StatusCode::BAD_REQUEST, "DEVICE.OPERATION_NOT_SUPPORTED")
        }
        DeviceError::DeviceNotConnected(_) => (StatusCode::CONFLICT, "DEVICE.NOT_CONNECTED"),
        DeviceError::ConnectionFailure { .. } => {
            (StatusCode::BAD_GATEWAY, "DEVICE.CONNECTION_FAILURE")
        }
        DeviceError::InvocationFailure { .. } => {
            (StatusCode::BAD_GATEWAY, "DEVICE.INVOCATION_FAILURE")
        }
        DeviceError::InvalidConfig(_) => (StatusCode::BAD_REQUEST, "INVALID.REQUEST"),
        DeviceError::Lock => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL.ERROR"),
    };
    if status.is_server_error() {
        error!(target: "iot.api", error = %err, "device_request_failed");
    } else {
        warn!(target: "iot.api", code, error = %err, "device_request_rejected");
    }
    error_response(status, code, err.to_string())
}

/// 发现错误到 HTTP 响应的映射；中止时仍返回已完成批次的结果
pub fn discovery_error(err: DiscoveryError) -> Response {
    match err {
        DiscoveryError::InvalidOptions(message) => error_response(
            StatusCode::BAD_REQUEST,
            "DISCOVERY.INVALID_OPTIONS",
            format!("invalid discovery options: {message}"),
        ),
        DiscoveryError::Fatal { message, partial } => {
            error!(target: "iot.api", error = %message, partial = partial.len(), "discovery_request_aborted");
            let body = ApiResponse {
                success: false,
                data: Some(partial.into_iter().map(discovery_to_dto).collect::<Vec<_>>()),
                error: Some(ApiError {
                    code: "DISCOVERY.FATAL".to_string(),
                    message,
                }),
            };
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}

pub fn protocol_to_dto(descriptor: ProtocolDescriptor) -> ProtocolDto {
    ProtocolDto {
        operations: descriptor
            .capabilities
            .operations()
            .into_iter()
            .map(|op| op.as_str().to_string())
            .collect(),
        supports_disconnect: descriptor.capabilities.disconnect,
        id: descriptor.id,
        display_name: descriptor.display_name,
        description: descriptor.description,
        default_port: descriptor.default_port,
        secure_port: descriptor.secure_port,
    }
}

pub fn device_to_dto(device: Device) -> DeviceDto {
    DeviceDto {
        id: device.id,
        name: device.name,
        device_type: device.device_type,
        protocol_id: device.protocol_id,
        host: device.host,
        port: device.port,
        status: device.status.as_str().to_string(),
        last_seen_ms: device.last_seen_ms,
        metadata: device.metadata,
    }
}

pub fn summary_to_dto(summary: DeviceSummary) -> DeviceSummaryDto {
    DeviceSummaryDto {
        id: summary.id,
        name: summary.name,
        device_type: summary.device_type,
        protocol_id: summary.protocol_id,
        host: summary.host,
        port: summary.port,
        status: summary.status.as_str().to_string(),
        last_seen_ms: summary.last_seen_ms,
    }
}

pub fn discovery_to_dto(result: DiscoveryResult) -> DiscoveryResultDto {
    DiscoveryResultDto {
        host: result.host,
        port: result.port,
        protocol_id: result.protocol_id,
        display_name: result.display_name,
        discovered_at_ms: result.discovered_at_ms,
    }
}

pub fn port_profile_from_dto(dto: PortProfileDto) -> PortProfile {
    PortProfile {
        port: dto.port,
        protocol_id: dto.protocol_id,
        display_name: dto.display_name,
    }
}
