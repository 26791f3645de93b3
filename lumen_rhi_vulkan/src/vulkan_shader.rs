/// Shader - SPIR-V shader modules with reflection
///
/// Only SPIR-V binaries are accepted. Each module is reflected with spirq;
/// descriptor bindings and push constants are listed in the shader report.

use std::ffi::CString;
use std::sync::Arc;

use ash::vk;
use lumen_rhi::lumen::render::{Report, ShaderDescriptor, ShaderSource, ShaderType};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::shader_stage_to_vk;

/// Vulkan shader module
pub struct VulkanShader {
    ctx: Arc<GpuContext>,
    /// Null when the shader failed to load
    pub(crate) module: vk::ShaderModule,
    pub(crate) stage: vk::ShaderStageFlags,
    pub(crate) entry_point: CString,
    pub(crate) desc: ShaderDescriptor,
    pub(crate) report: Report,
}

impl VulkanShader {
    /// Load a shader; every problem goes to the report
    pub fn new(ctx: &Arc<GpuContext>, desc: &ShaderDescriptor) -> Self {
        let mut report = Report::new();
        let entry_name = if desc.entry_point.is_empty() { "main" } else { desc.entry_point.as_str() };
        let entry_point = CString::new(entry_name).unwrap_or_else(|_| c"main".to_owned());

        if desc.shader_type != ShaderType::Vertex && !desc.vertex_attributes.is_empty() {
            report.warning(format!("vertex attributes ignored on a {:?} shader", desc.shader_type));
        }

        let module = match &desc.source {
            ShaderSource::Code(_) => {
                report.error("Vulkan needs SPIR-V binaries; shader source code cannot be compiled");
                vk::ShaderModule::null()
            }
            ShaderSource::Binary(bytes) => match parse_spirv(bytes) {
                Ok(words) => {
                    reflect(&words, entry_name, &mut report);
                    create_module(ctx, &words, &mut report)
                }
                Err(message) => {
                    report.error(message);
                    vk::ShaderModule::null()
                }
            },
        };

        if module != vk::ShaderModule::null() {
            if let Some(name) = &desc.debug_name {
                ctx.set_object_name(module, name);
            }
        }

        Self {
            ctx: Arc::clone(ctx),
            module,
            stage: shader_stage_to_vk(desc.shader_type),
            entry_point,
            desc: desc.clone(),
            report,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.module != vk::ShaderModule::null() && !self.report.has_errors()
    }
}

impl Drop for VulkanShader {
    fn drop(&mut self) {
        if self.module != vk::ShaderModule::null() {
            unsafe { self.ctx.device.destroy_shader_module(self.module, None) };
        }
    }
}

/// Decode a SPIR-V binary into words
pub(crate) fn parse_spirv(bytes: &[u8]) -> std::result::Result<Vec<u32>, String> {
    if bytes.is_empty() {
        return Err("shader binary is empty".to_string());
    }
    if bytes.len() % 4 != 0 {
        return Err(format!("shader binary size {} is not a multiple of 4", bytes.len()));
    }
    ash::util::read_spv(&mut std::io::Cursor::new(bytes)).map_err(|e| format!("invalid SPIR-V binary: {}", e))
}

fn create_module(ctx: &GpuContext, words: &[u32], report: &mut Report) -> vk::ShaderModule {
    let info = vk::ShaderModuleCreateInfo::default().code(words);
    match unsafe { ctx.device.create_shader_module(&info, None) } {
        Ok(module) => module,
        Err(e) => {
            report.error(format!("vkCreateShaderModule failed: {:?}", e));
            vk::ShaderModule::null()
        }
    }
}

/// Reflect descriptor bindings and push constants into the report
pub(crate) fn reflect(words: &[u32], entry_name: &str, report: &mut Report) {
    let entry_points = match spirq::ReflectConfig::new().spv(words).ref_all_rscs(true).reflect() {
        Ok(entry_points) => entry_points,
        Err(e) => {
            report.warning(format!("SPIR-V reflection failed: {:?}", e));
            return;
        }
    };

    let Some(entry_point) = entry_points.iter().find(|ep| ep.name == entry_name) else {
        let names: Vec<&str> = entry_points.iter().map(|ep| ep.name.as_str()).collect();
        report.error(format!("entry point '{}' not found (module has {:?})", entry_name, names));
        return;
    };

    for var in entry_point.vars.iter() {
        match var {
            spirq::var::Variable::Descriptor { name, desc_bind, desc_ty, .. } => {
                report.info(format!(
                    "binding set={} binding={} '{}' {:?}",
                    desc_bind.set(),
                    desc_bind.bind(),
                    name.clone().unwrap_or_default(),
                    desc_ty
                ));
            }
            spirq::var::Variable::PushConstant { name, ty } => {
                report.info(format!(
                    "push constants '{}' ({} bytes)",
                    name.clone().unwrap_or_default(),
                    ty.nbyte().unwrap_or(0)
                ));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "vulkan_shader_tests.rs"]
mod tests;
