use super::UploadError;

/// 一次上传尝试的最终结果。
///
/// 只有 `succeeded` 会驱动集合状态变化，其余字段仅用于诊断。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadOutcome {
    pub succeeded: bool,
    pub status_code: Option<u16>,
    pub response_body: Option<String>,
    pub error_detail: Option<String>,
}

impl UploadOutcome {
    pub(crate) fn success(status_code: u16, response_body: Option<String>) -> Self {
        Self {
            succeeded: true,
            status_code: Some(status_code),
            response_body,
            error_detail: None,
        }
    }

    /// 将错误折叠为失败结果；`HttpStatus` 会保留状态码与响应体。
    pub(crate) fn failure(error: UploadError) -> Self {
        let error_detail = Some(error.to_string());
        match error {
            UploadError::HttpStatus { status, body } => Self {
                succeeded: false,
                status_code: Some(status),
                response_body: body,
                error_detail,
            },
            _ => Self {
                succeeded: false,
                status_code: None,
                response_body: None,
                error_detail,
            },
        }
    }
}
