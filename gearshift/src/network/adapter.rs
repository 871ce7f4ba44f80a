use {
    anyhow::{bail, Context as _},
    serde::{Deserialize, Serialize},
    std::process::Command,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterInfo {
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "NetEnabled", default)]
    pub enabled: Option<bool>,
}

/// Enables and disables network adapters by id.
pub trait AdapterControl: Send + Sync {
    fn list_adapters(&self) -> anyhow::Result<Vec<AdapterInfo>>;
    fn set_enabled(&self, adapter_id: &str, enable: bool) -> anyhow::Result<()>;
}

/// Controls `Win32_NetworkAdapter` instances through PowerShell CIM cmdlets.
///
/// Toggling requires an elevated process.
#[derive(Debug, Default)]
pub struct WmiAdapterControl {}

impl WmiAdapterControl {
    pub fn new() -> Self {
        Self {}
    }

    fn run_powershell(&self, script: &str) -> anyhow::Result<String> {
        let output = Command::new("powershell")
            .args(["-NoProfile", "-NonInteractive", "-Command", script])
            .output()
            .with_context(|| format!("failed to execute powershell: {script:?}"))?;
        if !output.status.success() {
            bail!(
                "powershell failed with status {:?}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8(output.stdout)?)
    }
}

impl AdapterControl for WmiAdapterControl {
    fn list_adapters(&self) -> anyhow::Result<Vec<AdapterInfo>> {
        let output = self.run_powershell(
            "ConvertTo-Json -Compress -InputObject @(Get-CimInstance Win32_NetworkAdapter \
             -Filter 'PhysicalAdapter=True' | Select-Object DeviceID,Name,NetEnabled)",
        )?;
        serde_json::from_str(output.trim()).context("failed to parse adapter list")
    }

    fn set_enabled(&self, adapter_id: &str, enable: bool) -> anyhow::Result<()> {
        if adapter_id.is_empty() || !adapter_id.chars().all(|c| c.is_ascii_digit()) {
            bail!("invalid adapter id: {adapter_id:?}");
        }
        let method = if enable { "Enable" } else { "Disable" };
        let output = self.run_powershell(&format!(
            "(Get-CimInstance Win32_NetworkAdapter -Filter \"DeviceID='{adapter_id}'\" \
             -ErrorAction Stop | Invoke-CimMethod -MethodName {method} -ErrorAction Stop).ReturnValue"
        ))?;
        let code: u32 = output
            .trim()
            .parse()
            .with_context(|| format!("unexpected {method} output: {output:?}"))?;
        if code != 0 {
            bail!("{method} on adapter {adapter_id} failed with code {code}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cim_json() {
        let json = r#"[{"DeviceID":"7","Name":"Intel(R) Wi-Fi 6 AX201","NetEnabled":true},
                       {"DeviceID":"12","Name":"Realtek PCIe GbE","NetEnabled":null}]"#;
        let adapters: Vec<AdapterInfo> = serde_json::from_str(json).unwrap();
        assert_eq!(adapters.len(), 2);
        assert_eq!(adapters[0].device_id, "7");
        assert_eq!(adapters[0].enabled, Some(true));
        assert_eq!(adapters[1].enabled, None);
    }

    #[test]
    fn rejects_suspicious_ids() {
        let control = WmiAdapterControl::new();
        for id in ["", "7' OR '1'='1", "abc"] {
            assert!(control.set_enabled(id, false).is_err());
        }
    }
}
